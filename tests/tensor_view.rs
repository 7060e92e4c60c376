use beifeng::tensor::{TensorError, TensorShape, TensorView, transpose};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[test]
fn view_rejects_wrong_length_and_batch() {
  let data = [0.0f32; 10];

  let err = TensorView::new(&data, TensorShape::new(5, 3)).err().unwrap();
  assert_eq!(err, TensorError::LengthMismatch { expected: 15, got: 10 });

  let shape = TensorShape {
    batch: 2,
    channels: 5,
    anchors: 1,
  };
  let err = TensorView::new(&data, shape).err().unwrap();
  assert_eq!(err, TensorError::UnsupportedBatch(2));
}

#[test]
fn view_accessors_follow_channel_major_layout() {
  // 3 个通道, 4 个锚点
  let data: Vec<f32> = (0..12).map(|v| v as f32).collect();
  let view = TensorView::new(&data, TensorShape::new(3, 4)).unwrap();

  assert_eq!(view.get(0, 0), Some(0.0));
  assert_eq!(view.get(1, 2), Some(6.0));
  assert_eq!(view.get(2, 3), Some(11.0));
  assert_eq!(view.get(3, 0), None);
  assert_eq!(view.get(0, 4), None);
  assert_eq!(view.channel(1).unwrap(), &[4.0, 5.0, 6.0, 7.0]);
  assert!(view.channel(3).is_none());
}

#[test]
fn anchor_major_rows_hold_every_channel() {
  let data: Vec<f32> = (0..12).map(|v| v as f32).collect();
  let view = TensorView::new(&data, TensorShape::new(3, 4)).unwrap();
  let rows = view.to_anchor_major();

  assert_eq!(rows.anchors(), 4);
  assert_eq!(rows.channels(), 3);
  assert_eq!(rows.row(0).unwrap(), &[0.0, 4.0, 8.0]);
  assert_eq!(rows.row(3).unwrap(), &[3.0, 7.0, 11.0]);
  assert!(rows.row(4).is_none());
  assert_eq!(rows.rows().len(), 4);

  for (n, row) in rows.rows().enumerate() {
    for (c, &value) in row.iter().enumerate() {
      assert_eq!(Some(value), view.get(c, n));
    }
  }
}

#[test]
fn transpose_round_trip_is_identity() {
  let mut rng = StdRng::seed_from_u64(7);
  for _ in 0..20 {
    let channels = rng.random_range(1..=12);
    let anchors = rng.random_range(1..=64);
    let data: Vec<f32> = (0..channels * anchors)
      .map(|_| rng.random_range(-100.0f32..100.0))
      .collect();

    let view = TensorView::new(&data, TensorShape::new(channels, anchors)).unwrap();
    let back = view.to_anchor_major().to_channel_major();
    assert_eq!(back, data);

    let twice = transpose(&transpose(&data, channels, anchors).unwrap(), anchors, channels).unwrap();
    assert_eq!(twice, data);
  }
}

#[test]
fn zero_anchor_view_is_valid() {
  let view = TensorView::new(&[], TensorShape::new(84, 0)).unwrap();
  assert_eq!(view.to_anchor_major().rows().len(), 0);
}

#[test]
fn oversized_shape_is_an_error() {
  let shape = TensorShape::new(usize::MAX / 2, 3);
  assert_eq!(shape.num_elements(), None);
  assert!(matches!(
    TensorView::new(&[], shape),
    Err(TensorError::InvalidShape(_))
  ));
  assert!(matches!(
    transpose(&[], usize::MAX, 3),
    Err(TensorError::InvalidShape(_))
  ));
}

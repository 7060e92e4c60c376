use beifeng::model::{BBox, DecodeError, LabelTable, ScaleFactor, decode, decode_raw, suppress};
use beifeng::tensor::{TensorShape, TensorView};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// 由逐锚点记录构造通道优先缓冲区
fn channel_major(anchors: &[Vec<f32>]) -> (Vec<f32>, TensorShape) {
  let channels = anchors.first().map(|a| a.len()).unwrap_or(0);
  let mut data = vec![0.0f32; channels * anchors.len()];
  for (n, anchor) in anchors.iter().enumerate() {
    for (c, &value) in anchor.iter().enumerate() {
      data[c * anchors.len() + n] = value;
    }
  }
  (data, TensorShape::new(channels, anchors.len()))
}

fn labels(n: usize) -> LabelTable {
  LabelTable::new((0..n).map(|i| format!("class{}", i))).unwrap()
}

#[test]
fn single_anchor_takes_best_class() {
  let (data, shape) = channel_major(&[vec![320.0, 320.0, 64.0, 32.0, 0.9, 0.05, 0.05]]);
  let result = decode_raw(&data, shape, ScaleFactor::identity(), &labels(3)).unwrap();

  assert_eq!(result.len(), 1);
  let item = &result.items[0];
  assert_eq!(item.class_id, 0);
  assert_eq!(&*item.label, "class0");
  assert_eq!(item.confidence, 0.9);
  assert_eq!(item.bbox, BBox::new(288.0, 304.0, 64.0, 32.0));

  let kept = suppress(result, 0.5, 0.5);
  assert_eq!(kept.len(), 1);
  assert_eq!(kept.items[0].class_id, 0);
  assert_eq!(kept.items[0].confidence, 0.9);
}

#[test]
fn boxes_are_scaled_per_axis() {
  let (data, shape) = channel_major(&[vec![100.0, 50.0, 40.0, 20.0, 0.1, 0.8]]);
  let scale = ScaleFactor::new(2.0, 1.5);
  let result = decode_raw(&data, shape, scale, &labels(2)).unwrap();

  let item = &result.items[0];
  assert_eq!(item.class_id, 1);
  assert_eq!(item.bbox, BBox::new(160.0, 60.0, 80.0, 30.0));
}

#[test]
fn scale_from_frame_and_input_sizes() {
  let scale = ScaleFactor::from_sizes((1280, 720), (640, 640));
  assert_eq!(scale, ScaleFactor::new(2.0, 1.125));
}

#[test]
fn argmax_ties_resolve_to_lowest_class() {
  let (data, shape) = channel_major(&[
    vec![10.0, 10.0, 4.0, 4.0, 0.3, 0.7, 0.7],
    vec![10.0, 10.0, 4.0, 4.0, 0.6, 0.6, 0.6],
  ]);
  let result = decode_raw(&data, shape, ScaleFactor::identity(), &labels(3)).unwrap();

  assert_eq!(result.items[0].class_id, 1);
  assert_eq!(result.items[1].class_id, 0);
}

#[test]
fn one_detection_per_anchor_in_anchor_order() {
  let mut rng = StdRng::seed_from_u64(42);
  let num_classes = 5;
  let anchors: Vec<Vec<f32>> = (0..200)
    .map(|n| {
      let mut row = vec![n as f32, 0.0, 8.0, 8.0];
      row.extend((0..num_classes).map(|_| rng.random_range(0.0f32..1.0)));
      row
    })
    .collect();
  let (data, shape) = channel_major(&anchors);

  let result = decode_raw(&data, shape, ScaleFactor::identity(), &labels(num_classes)).unwrap();
  assert_eq!(result.len(), 200);
  for (n, item) in result.iter().enumerate() {
    // cx = n, w = 8
    assert_eq!(item.bbox.x, n as f32 - 4.0);
  }
}

#[test]
fn degenerate_anchors_are_kept() {
  let (data, shape) = channel_major(&[
    vec![10.0, 10.0, 0.0, 5.0, 0.9],
    vec![10.0, 10.0, -3.0, 5.0, 0.8],
  ]);
  let result = decode_raw(&data, shape, ScaleFactor::identity(), &labels(1)).unwrap();
  assert_eq!(result.len(), 2);
  assert!(result.iter().all(|d| d.bbox.is_degenerate()));
}

#[test]
fn shape_mismatch_iff_label_count_differs() {
  let (data, shape) = channel_major(&[vec![1.0, 1.0, 1.0, 1.0, 0.5, 0.5, 0.5]]);

  for n in 1..6 {
    let outcome = decode_raw(&data, shape, ScaleFactor::identity(), &labels(n));
    if n == 3 {
      assert!(outcome.is_ok());
    } else {
      assert_eq!(
        outcome.unwrap_err(),
        DecodeError::ShapeMismatch {
          channels: 7,
          labels: n,
        }
      );
    }
  }
}

#[test]
fn too_few_channels_is_shape_mismatch() {
  let data = [0.0f32; 6];
  let view = TensorView::new(&data, TensorShape::new(3, 2)).unwrap();
  let err = decode(view, ScaleFactor::identity(), &labels(1)).unwrap_err();
  assert_eq!(err, DecodeError::ShapeMismatch { channels: 3, labels: 1 });
}

#[test]
fn buffer_length_is_validated() {
  let err = decode_raw(&[0.0; 6], TensorShape::new(7, 1), ScaleFactor::identity(), &labels(3))
    .unwrap_err();
  assert!(matches!(err, DecodeError::Tensor(_)));
}

#[test]
fn zero_anchors_decode_to_empty() {
  let result = decode_raw(&[], TensorShape::new(84, 0), ScaleFactor::identity(), &LabelTable::coco())
    .unwrap();
  assert!(result.is_empty());
}

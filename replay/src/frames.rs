use anyhow::{Context, Result};
use serde::Serialize;
use tracker::{BoundingBox, TrackSnapshot};

/// One line of replay output.
#[derive(Debug, Serialize)]
pub struct FrameOutput<'a> {
    pub frame: u64,
    pub tracks: &'a [TrackSnapshot],
}

/// Parses a recorded frame, a JSON array of `[x1, y1, x2, y2]` boxes.
pub fn parse_frame(line: &str) -> Result<Vec<BoundingBox>> {
    let values = serde_json::from_str::<Vec<Vec<f64>>>(line)
        .context("expected a JSON array of [x1, y1, x2, y2] boxes")?;

    values
        .iter()
        .enumerate()
        .map(|(index, coordinates)| {
            BoundingBox::try_from(coordinates.as_slice())
                .with_context(|| format!("detection {index}"))
        })
        .collect()
}

#[cfg(test)]
mod test {
    use tracker::{BoundingBox, Error};

    use super::parse_frame;

    #[test]
    fn parse_boxes() {
        let boxes = parse_frame("[[0, 0, 10, 10], [20.5, 4, 30, 8]]").unwrap();

        assert_eq!(
            boxes,
            vec![
                BoundingBox::new(0.0, 0.0, 10.0, 10.0),
                BoundingBox::new(20.5, 4.0, 30.0, 8.0)
            ]
        );
    }

    #[test]
    fn parse_empty_frame() {
        assert!(parse_frame("[]").unwrap().is_empty());
    }

    #[test]
    fn parse_wrong_arity_is_validation_error() {
        let error = parse_frame("[[0, 0, 10, 10], [1, 2, 3]]").unwrap_err();

        assert_eq!(error.to_string(), "detection 1");
        assert!(matches!(
            error.root_cause().downcast_ref::<Error>(),
            Some(Error::Validation(_))
        ));
    }

    #[test]
    fn parse_not_an_array() {
        assert!(parse_frame(r#"{ "boxes": [] }"#).is_err());
        assert!(parse_frame("[[0, 0, \"a\", 1]]").is_err());
    }
}

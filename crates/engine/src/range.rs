use serde::{Deserialize, Serialize};

/// A rectangular selection as the browser editor records it:
/// `{"row": [r1, r2], "column": [c1, c2]}`, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRange {
    pub row: [usize; 2],
    pub column: [usize; 2],
}

impl SelectionRange {
    pub fn new(start_row: usize, start_col: usize, end_row: usize, end_col: usize) -> Self {
        Self {
            row: [start_row.min(end_row), start_row.max(end_row)],
            column: [start_col.min(end_col), start_col.max(end_col)],
        }
    }

    pub fn cell(row: usize, col: usize) -> Self {
        Self::new(row, col, row, col)
    }

    pub fn rows(&self) -> std::ops::RangeInclusive<usize> {
        self.row[0]..=self.row[1]
    }

    pub fn cols(&self) -> std::ops::RangeInclusive<usize> {
        self.column[0]..=self.column[1]
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.rows().contains(&row) && self.cols().contains(&col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_normalizes_corners() {
        let range = SelectionRange::new(4, 3, 1, 0);
        assert_eq!(range.row, [1, 4]);
        assert_eq!(range.column, [0, 3]);
        assert!(range.contains(2, 2));
        assert!(!range.contains(5, 0));
    }

    #[test]
    fn test_wire_shape() {
        let range: SelectionRange =
            serde_json::from_str(r#"{"row":[0,2],"column":[1,1],"row_focus":0}"#).unwrap();
        assert_eq!(range, SelectionRange::new(0, 1, 2, 1));
    }
}

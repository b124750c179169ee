use crate::sheet::{Sheet, SheetId};

/// Name given to the single sheet of a freshly created workbook.
pub const DEFAULT_SHEET_NAME: &str = "Sheet1";

/// A workbook containing multiple sheets
#[derive(Debug, Clone, PartialEq)]
pub struct Workbook {
    sheets: Vec<Sheet>,
    active_sheet: usize,
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

impl Workbook {
    /// Create a new workbook with one empty default sheet
    pub fn new() -> Self {
        Self::with_sheet_name(DEFAULT_SHEET_NAME)
    }

    /// Create a new workbook whose single empty sheet has the given name
    pub fn with_sheet_name(name: &str) -> Self {
        Self {
            sheets: vec![Sheet::new(SheetId::Number(0), name)],
            active_sheet: 0,
        }
    }

    /// Create a workbook from decoded sheets.
    /// An empty list yields the default workbook.
    pub fn from_sheets(sheets: Vec<Sheet>, active: usize) -> Self {
        if sheets.is_empty() {
            return Self::new();
        }
        let active_sheet = active.min(sheets.len() - 1);
        Self { sheets, active_sheet }
    }

    /// Get the number of sheets
    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    /// Get the active sheet index
    pub fn active_sheet_index(&self) -> usize {
        self.active_sheet
    }

    /// Set the active sheet by index
    pub fn set_active_sheet(&mut self, index: usize) -> bool {
        if index < self.sheets.len() {
            self.active_sheet = index;
            true
        } else {
            false
        }
    }

    pub fn active_sheet(&self) -> &Sheet {
        &self.sheets[self.active_sheet]
    }

    pub fn active_sheet_mut(&mut self) -> &mut Sheet {
        &mut self.sheets[self.active_sheet]
    }

    pub fn sheet(&self, index: usize) -> Option<&Sheet> {
        self.sheets.get(index)
    }

    pub fn sheet_mut(&mut self, index: usize) -> Option<&mut Sheet> {
        self.sheets.get_mut(index)
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    /// Check if a sheet name already exists (case-insensitive)
    pub fn sheet_name_exists(&self, name: &str) -> bool {
        let key = name.trim().to_lowercase();
        self.sheets.iter().any(|s| s.name.trim().to_lowercase() == key)
    }

    /// Add a new sheet at the end and return its index.
    /// Returns None if the name is blank or already taken.
    pub fn add_sheet_named(&mut self, name: &str) -> Option<usize> {
        if name.trim().is_empty() || self.sheet_name_exists(name) {
            return None;
        }
        let mut sheet = Sheet::new(self.next_sheet_id(), name.trim());
        sheet.order = self.sheets.iter().map(|s| s.order + 1).max().unwrap_or(0);
        self.sheets.push(sheet);
        Some(self.sheets.len() - 1)
    }

    /// Numeric ids are allocated past the largest numeric id in use.
    fn next_sheet_id(&self) -> SheetId {
        let max = self
            .sheets
            .iter()
            .filter_map(|s| match s.id {
                SheetId::Number(n) => Some(n),
                SheetId::Text(_) => None,
            })
            .max();
        SheetId::Number(max.map_or(0, |n| n + 1))
    }

    /// Give a sheet a new order index. Collisions are allowed until the
    /// next `normalize_order`.
    pub fn set_sheet_order(&mut self, index: usize, order: usize) -> bool {
        match self.sheets.get_mut(index) {
            Some(sheet) => {
                sheet.order = order;
                true
            }
            None => false,
        }
    }

    /// Sort sheets by order index (stable, so colliding sheets keep their
    /// relative position) and renumber them `0..n`. The active sheet follows
    /// its sheet.
    pub fn normalize_order(&mut self) {
        let active_id = self.sheets[self.active_sheet].id.clone();
        self.sheets.sort_by_key(|s| s.order);
        for (i, sheet) in self.sheets.iter_mut().enumerate() {
            sheet.order = i;
        }
        self.active_sheet = self
            .sheets
            .iter()
            .position(|s| s.id == active_id)
            .unwrap_or(0);
    }

    /// Drop transient selection state from every sheet.
    pub fn clear_selections(&mut self) {
        for sheet in &mut self.sheets {
            sheet.clear_selection();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_workbook() {
        let wb = Workbook::new();
        assert_eq!(wb.sheet_count(), 1);
        assert_eq!(wb.active_sheet_index(), 0);
        assert_eq!(wb.active_sheet().name, "Sheet1");
        assert_eq!(wb.active_sheet().id, SheetId::Number(0));
        assert!(wb.active_sheet().is_empty());
    }

    #[test]
    fn test_add_sheet_named() {
        let mut wb = Workbook::new();
        let idx = wb.add_sheet_named("Totals").unwrap();
        assert_eq!(idx, 1);
        assert_eq!(wb.sheet(1).unwrap().id, SheetId::Number(1));
        assert_eq!(wb.sheet(1).unwrap().order, 1);

        assert!(wb.add_sheet_named("totals").is_none());
        assert!(wb.add_sheet_named("  ").is_none());
    }

    #[test]
    fn test_normalize_order_resolves_collisions() {
        let mut wb = Workbook::new();
        wb.add_sheet_named("B");
        wb.add_sheet_named("C");
        wb.set_active_sheet(2);

        // Mid-reorder: C moved to the front, B collides with Sheet1
        wb.set_sheet_order(2, 0);
        wb.set_sheet_order(1, 0);
        wb.set_sheet_order(0, 1);
        wb.normalize_order();

        assert_eq!(wb.sheet_names(), vec!["B", "C", "Sheet1"]);
        let orders: Vec<usize> = wb.sheets().iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        assert_eq!(wb.active_sheet().name, "C");
    }

    #[test]
    fn test_from_sheets_empty_falls_back_to_default() {
        let wb = Workbook::from_sheets(Vec::new(), 3);
        assert_eq!(wb, Workbook::new());
    }
}

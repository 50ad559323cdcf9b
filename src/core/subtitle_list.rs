use super::error::ValidationError;
use super::subtitle::Subtitle;

/// Which field of a draft is being changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleField {
    Start,
    End,
    Text,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowMode {
    Viewing,
    /// Holds the uncommitted values while the row is open for editing.
    Editing(Subtitle),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleRow {
    pub subtitle: Subtitle,
    pub mode: RowMode,
}

impl SubtitleRow {
    pub fn is_editing(&self) -> bool {
        matches!(self.mode, RowMode::Editing(_))
    }
}

/// Ordered caption rows. Overlapping or out-of-order rows are allowed; only
/// the row being saved is validated.
#[derive(Debug, Clone, Default)]
pub struct SubtitleList {
    rows: Vec<SubtitleRow>,
}

impl SubtitleList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_subtitles(subtitles: Vec<Subtitle>) -> Self {
        Self {
            rows: subtitles
                .into_iter()
                .map(|subtitle| SubtitleRow { subtitle, mode: RowMode::Viewing })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[SubtitleRow] {
        &self.rows
    }

    pub fn get(&self, index: usize) -> Option<&SubtitleRow> {
        self.rows.get(index)
    }

    /// Committed values, in display order.
    pub fn subtitles(&self) -> Vec<Subtitle> {
        self.rows.iter().map(|row| row.subtitle.clone()).collect()
    }

    /// Prepend a blank row, already open for editing.
    pub fn add(&mut self) {
        let blank = Subtitle::blank();
        self.rows.insert(0, SubtitleRow {
            subtitle: blank.clone(),
            mode: RowMode::Editing(blank),
        });
    }

    pub fn begin_edit(&mut self, index: usize) -> Result<(), ValidationError> {
        let row = self.rows.get_mut(index).ok_or(ValidationError::NoSuchRow(index))?;
        if !row.is_editing() {
            row.mode = RowMode::Editing(row.subtitle.clone());
        }
        Ok(())
    }

    pub fn update_draft(&mut self, index: usize, field: SubtitleField, value: impl Into<String>) -> Result<(), ValidationError> {
        let row = self.rows.get_mut(index).ok_or(ValidationError::NoSuchRow(index))?;
        let RowMode::Editing(draft) = &mut row.mode else {
            return Err(ValidationError::NotEditing(index));
        };
        let value = value.into();
        match field {
            SubtitleField::Start => draft.start = value,
            SubtitleField::End => draft.end = value,
            SubtitleField::Text => draft.text = value,
        }
        Ok(())
    }

    /// Commit the draft. On rejection the row stays in editing mode and the
    /// committed values are untouched.
    pub fn save(&mut self, index: usize) -> Result<(), ValidationError> {
        let row = self.rows.get_mut(index).ok_or(ValidationError::NoSuchRow(index))?;
        let RowMode::Editing(draft) = &row.mode else {
            return Err(ValidationError::NotEditing(index));
        };
        if let Err(e) = draft.validate() {
            log::warn!("Rejected subtitle edit at row {}: {}", index, e);
            return Err(e);
        }
        row.subtitle = draft.clone();
        row.mode = RowMode::Viewing;
        log::debug!("Saved subtitle row {}: {} - {}", index, row.subtitle.start, row.subtitle.end);
        Ok(())
    }

    pub fn cancel(&mut self, index: usize) -> Result<(), ValidationError> {
        let row = self.rows.get_mut(index).ok_or(ValidationError::NoSuchRow(index))?;
        row.mode = RowMode::Viewing;
        Ok(())
    }

    /// Remove a row. There is no undo.
    pub fn delete(&mut self, index: usize) -> Result<Subtitle, ValidationError> {
        if index >= self.rows.len() {
            return Err(ValidationError::NoSuchRow(index));
        }
        Ok(self.rows.remove(index).subtitle)
    }

    /// Indices of every row whose committed interval contains `position`.
    pub fn active_indices(&self, position: f64) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.subtitle.is_active_at(position))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn first_active(&self, position: f64) -> Option<&Subtitle> {
        self.rows
            .iter()
            .map(|row| &row.subtitle)
            .find(|subtitle| subtitle.is_active_at(position))
    }

    /// Validate every committed row, e.g. before sending the list to the backend.
    pub fn validate_all(&self) -> Result<(), (usize, ValidationError)> {
        for (i, row) in self.rows.iter().enumerate() {
            row.subtitle.validate().map_err(|e| (i, e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_list() -> SubtitleList {
        SubtitleList::from_subtitles(vec![
            Subtitle::new("00:01", "00:03", "hi"),
            Subtitle::new("00:05", "00:08", "there"),
        ])
    }

    #[test]
    fn test_valid_edit_commits() {
        let mut list = sample_list();
        list.begin_edit(0).unwrap();
        list.update_draft(0, SubtitleField::Start, "00:02").unwrap();
        list.update_draft(0, SubtitleField::End, "00:04").unwrap();
        list.update_draft(0, SubtitleField::Text, "hello").unwrap();

        assert!(list.save(0).is_ok());
        let row = list.get(0).unwrap();
        assert!(!row.is_editing());
        assert_eq!(row.subtitle, Subtitle::new("00:02", "00:04", "hello"));
    }

    #[test]
    fn test_invalid_ordering_keeps_prior_values() {
        let mut list = sample_list();
        list.begin_edit(0).unwrap();
        list.update_draft(0, SubtitleField::Start, "00:04").unwrap();
        list.update_draft(0, SubtitleField::End, "00:04").unwrap();

        assert!(matches!(list.save(0), Err(ValidationError::StartNotBeforeEnd { .. })));
        let row = list.get(0).unwrap();
        assert!(row.is_editing());
        assert_eq!(row.subtitle.start, "00:01");
        assert_eq!(row.subtitle.end, "00:03");
    }

    #[test]
    fn test_invalid_format_blocks_save() {
        let mut list = sample_list();
        list.begin_edit(1).unwrap();
        list.update_draft(1, SubtitleField::End, "8 seconds").unwrap();
        assert!(matches!(list.save(1), Err(ValidationError::InvalidFormat { field: "end", .. })));
        assert_eq!(list.get(1).unwrap().subtitle.end, "00:08");
    }

    #[test]
    fn test_cancel_discards_draft() {
        let mut list = sample_list();
        list.begin_edit(0).unwrap();
        list.update_draft(0, SubtitleField::Text, "changed").unwrap();
        list.cancel(0).unwrap();
        assert_eq!(list.get(0).unwrap().subtitle.text, "hi");
        assert!(!list.get(0).unwrap().is_editing());
    }

    #[test]
    fn test_draft_requires_editing() {
        let mut list = sample_list();
        assert_eq!(
            list.update_draft(0, SubtitleField::Text, "x"),
            Err(ValidationError::NotEditing(0))
        );
        assert_eq!(list.save(0), Err(ValidationError::NotEditing(0)));
        assert_eq!(list.begin_edit(7), Err(ValidationError::NoSuchRow(7)));
    }

    #[test]
    fn test_add_prepends_blank_editing_row() {
        let mut list = sample_list();
        list.add();
        assert_eq!(list.len(), 3);
        let row = list.get(0).unwrap();
        assert!(row.is_editing());
        assert_eq!(row.subtitle, Subtitle::blank());
    }

    #[test]
    fn test_delete_removes_row() {
        let mut list = sample_list();
        let removed = list.delete(0).unwrap();
        assert_eq!(removed.text, "hi");
        assert_eq!(list.len(), 1);
        assert!(list.delete(5).is_err());
    }

    #[test]
    fn test_active_rows_follow_position() {
        let list = SubtitleList::from_subtitles(vec![Subtitle::new("00:01", "00:03", "hi")]);
        assert_eq!(list.active_indices(2.0), vec![0]);
        assert!(list.active_indices(3.5).is_empty());
        assert_eq!(list.first_active(2.0).map(|s| s.text.as_str()), Some("hi"));
    }

    #[test]
    fn test_overlapping_rows_are_all_active() {
        let list = SubtitleList::from_subtitles(vec![
            Subtitle::new("00:00", "00:05", "a"),
            Subtitle::new("00:02", "00:04", "b"),
        ]);
        assert_eq!(list.active_indices(3.0), vec![0, 1]);
    }

    #[test]
    fn test_validate_all_reports_first_bad_row() {
        let mut list = sample_list();
        list.add();
        let (index, _) = list.validate_all().unwrap_err();
        assert_eq!(index, 0);
    }
}

use std::path::{Path, PathBuf};

use log::info;

use crate::error::{Result, SsrfError};
use crate::mapping::{auto_detect, ColumnMapping, Field, DISPLAY_ORDER};
use crate::models::CsvPreview;

/// Where a single CSV upload currently stands.
#[derive(Debug, Default)]
pub enum UploadState {
    #[default]
    Idle,
    PreviewLoaded {
        file: PathBuf,
        preview: CsvPreview,
    },
    MappingEditing {
        file: PathBuf,
        preview: CsvPreview,
        mapping: ColumnMapping,
        /// Field rows as displayed; reordering never changes the mapping.
        order: Vec<Field>,
    },
    Confirmed {
        file: PathBuf,
    },
}

/// Drives one upload from preview to a confirmed mapping. The mapping leaves
/// the session exactly once, through [`UploadSession::confirm`].
#[derive(Debug, Default)]
pub struct UploadSession {
    state: UploadState,
    last_error: Option<String>,
}

impl UploadSession {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn is_idle(&self) -> bool {
        matches!(self.state, UploadState::Idle)
    }

    /// Server message from the last failed call, shown verbatim.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn load_preview(&mut self, file: &Path, preview: CsvPreview) {
        self.last_error = None;
        self.state = UploadState::PreviewLoaded {
            file: file.to_path_buf(),
            preview,
        };
    }

    /// A preview or upload call failed: back to `Idle`, keep the message.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
        self.state = UploadState::Idle;
    }

    /// Run auto-detection over the preview columns and start editing.
    pub fn begin_editing(&mut self) -> Result<&ColumnMapping> {
        match std::mem::take(&mut self.state) {
            UploadState::PreviewLoaded { file, preview } => {
                let mapping = auto_detect(&preview.columns);
                for (field, column) in mapping.assigned() {
                    info!("detected {field} -> {column}");
                }
                self.state = UploadState::MappingEditing {
                    file,
                    preview,
                    mapping,
                    order: DISPLAY_ORDER.to_vec(),
                };
                self.mapping()
                    .ok_or_else(|| SsrfError::Other("mapping editor did not start".into()))
            }
            other => {
                self.state = other;
                Err(SsrfError::Other("no CSV preview loaded".into()))
            }
        }
    }

    pub fn preview(&self) -> Option<&CsvPreview> {
        match &self.state {
            UploadState::PreviewLoaded { preview, .. }
            | UploadState::MappingEditing { preview, .. } => Some(preview),
            _ => None,
        }
    }

    pub fn file(&self) -> Option<&Path> {
        match &self.state {
            UploadState::PreviewLoaded { file, .. }
            | UploadState::MappingEditing { file, .. }
            | UploadState::Confirmed { file } => Some(file),
            UploadState::Idle => None,
        }
    }

    pub fn mapping(&self) -> Option<&ColumnMapping> {
        match &self.state {
            UploadState::MappingEditing { mapping, .. } => Some(mapping),
            _ => None,
        }
    }

    pub fn order(&self) -> &[Field] {
        match &self.state {
            UploadState::MappingEditing { order, .. } => order,
            _ => &[],
        }
    }

    pub fn assign(&mut self, field: Field, column: Option<String>) -> Result<()> {
        match &mut self.state {
            UploadState::MappingEditing { mapping, .. } => {
                mapping.set(field, column);
                Ok(())
            }
            _ => Err(SsrfError::Other("mapping is not being edited".into())),
        }
    }

    pub fn apply_overrides(&mut self, overrides: &[String]) -> Result<()> {
        match &mut self.state {
            UploadState::MappingEditing { mapping, .. } => mapping.apply_overrides(overrides),
            _ => Err(SsrfError::Other("mapping is not being edited".into())),
        }
    }

    /// Step a field through "none" followed by every preview column.
    pub fn cycle_column(&mut self, field: Field, forward: bool) {
        if let UploadState::MappingEditing {
            preview, mapping, ..
        } = &mut self.state
        {
            let options = preview.columns.len() + 1;
            let current = mapping
                .get(field)
                .and_then(|c| preview.columns.iter().position(|p| p == c))
                .map(|i| i + 1)
                .unwrap_or(0);
            let next = if forward {
                (current + 1) % options
            } else {
                (current + options - 1) % options
            };
            let column = match next {
                0 => None,
                i => Some(preview.columns[i - 1].clone()),
            };
            mapping.set(field, column);
        }
    }

    /// Move the row at `index` one step; returns its new index.
    pub fn move_row(&mut self, index: usize, up: bool) -> usize {
        if let UploadState::MappingEditing { order, .. } = &mut self.state {
            if up && index > 0 && index < order.len() {
                order.swap(index, index - 1);
                return index - 1;
            }
            if !up && index + 1 < order.len() {
                order.swap(index, index + 1);
                return index + 1;
            }
        }
        index
    }

    pub fn can_confirm(&self) -> bool {
        self.mapping().is_some_and(ColumnMapping::validate)
    }

    /// Hand out the mapping for submission. Fails without changing state when
    /// the mapping is incomplete.
    pub fn confirm(&mut self) -> Result<ColumnMapping> {
        match std::mem::take(&mut self.state) {
            UploadState::MappingEditing {
                file,
                preview,
                mapping,
                order,
            } => {
                if !mapping.validate() {
                    let problems = mapping.problems().join(", ");
                    self.state = UploadState::MappingEditing {
                        file,
                        preview,
                        mapping,
                        order,
                    };
                    return Err(SsrfError::InvalidMapping(problems));
                }
                self.state = UploadState::Confirmed { file };
                Ok(mapping)
            }
            UploadState::Confirmed { file } => {
                self.state = UploadState::Confirmed { file };
                Err(SsrfError::Other("mapping was already submitted".into()))
            }
            other => {
                self.state = other;
                Err(SsrfError::Other("mapping is not being edited".into()))
            }
        }
    }

    pub fn cancel(&mut self) {
        self.state = UploadState::Idle;
    }

    /// The upload went through; the session is reusable.
    pub fn finish(&mut self) {
        self.last_error = None;
        self.state = UploadState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preview(columns: &[&str]) -> CsvPreview {
        CsvPreview {
            columns: columns.iter().map(|s| s.to_string()).collect(),
            sample_rows: vec![],
        }
    }

    fn editing(columns: &[&str]) -> UploadSession {
        let mut s = UploadSession::new();
        s.load_preview(Path::new("bank.csv"), preview(columns));
        s.begin_editing().unwrap();
        s
    }

    #[test]
    fn test_happy_path() {
        let mut s = editing(&["Date", "Amount"]);
        assert!(s.can_confirm());
        let mapping = s.confirm().unwrap();
        assert_eq!(mapping.get(Field::Date), Some("Date"));
        assert!(s.preview().is_none() && s.file().is_some());
        assert_eq!(s.file(), Some(Path::new("bank.csv")));
        s.finish();
        assert!(s.is_idle());
    }

    #[test]
    fn test_confirm_consumes_once() {
        let mut s = editing(&["Date", "Amount"]);
        s.confirm().unwrap();
        assert!(s.confirm().is_err());
    }

    #[test]
    fn test_invalid_mapping_blocks_confirm() {
        let mut s = editing(&["Booked", "Amount"]);
        assert!(!s.can_confirm());
        let err = s.confirm().unwrap_err();
        assert!(matches!(err, SsrfError::InvalidMapping(_)));
        assert!(s.mapping().is_some());
        s.assign(Field::Date, Some("Booked".into())).unwrap();
        assert!(s.confirm().is_ok());
    }

    #[test]
    fn test_begin_editing_requires_preview() {
        let mut s = UploadSession::new();
        assert!(s.begin_editing().is_err());
        assert!(s.is_idle());
    }

    #[test]
    fn test_cancel_returns_to_idle() {
        let mut s = editing(&["Date", "Amount"]);
        s.cancel();
        assert!(s.is_idle());
        assert!(s.mapping().is_none());
    }

    #[test]
    fn test_failure_records_message() {
        let mut s = editing(&["Date", "Amount"]);
        s.fail("Invalid CSV file");
        assert!(s.is_idle());
        assert_eq!(s.last_error(), Some("Invalid CSV file"));
        s.load_preview(Path::new("other.csv"), preview(&["Date"]));
        assert!(s.last_error().is_none());
    }

    #[test]
    fn test_cycle_column_wraps_through_none() {
        let mut s = editing(&["Date", "Amount"]);
        s.cycle_column(Field::Amount, true);
        assert_eq!(s.mapping().unwrap().get(Field::Amount), None);
        s.cycle_column(Field::Amount, true);
        assert_eq!(s.mapping().unwrap().get(Field::Amount), Some("Date"));
        s.cycle_column(Field::Amount, false);
        assert_eq!(s.mapping().unwrap().get(Field::Amount), None);
        s.cycle_column(Field::Amount, false);
        assert_eq!(s.mapping().unwrap().get(Field::Amount), Some("Amount"));
    }

    #[test]
    fn test_move_row_is_display_only() {
        let mut s = editing(&["Date", "Amount"]);
        let before = s.mapping().unwrap().clone();
        assert_eq!(s.move_row(1, true), 0);
        assert_eq!(s.order()[0], Field::Amount);
        assert_eq!(s.move_row(0, true), 0);
        let last = s.order().len() - 1;
        assert_eq!(s.move_row(last, false), last);
        assert_eq!(s.mapping().unwrap(), &before);
    }
}

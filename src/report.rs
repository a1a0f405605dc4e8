//! CSV reports.
//!
//! A report is a `Serialize` row type registered with [`create_report_trait!`].
//! `add_report::<T>("name")` opens `<directory>/<file_prefix>name.csv` and
//! every later `send_report(row)` of type `T` appends one row to it.
use std::any::TypeId;
use std::cell::RefCell;
use std::fs::{create_dir_all, File};
use std::path::{Path, PathBuf};

use csv::Writer;
use log::trace;
use serde_derive::Serialize;

use crate::context::Context;
use crate::define_data_plugin;
use crate::dispatch::DispatchPhase;
use crate::error::SimError;
use crate::risk::Day;
use crate::HashMap;

pub trait Report: 'static {
    // Returns report type
    fn type_id(&self) -> TypeId;
    // Serializes the data with the correct writer
    fn serialize(&self, writer: &mut Writer<File>) -> Result<(), SimError>;
}

/// Use this macro to define a unique report type
#[macro_export]
macro_rules! create_report_trait {
    ($name:ident) => {
        impl $crate::report::Report for $name {
            fn type_id(&self) -> std::any::TypeId {
                std::any::TypeId::of::<$name>()
            }

            fn serialize(
                &self,
                writer: &mut csv::Writer<std::fs::File>,
            ) -> Result<(), $crate::error::SimError> {
                writer.serialize(self)?;
                Ok(())
            }
        }
    };
}
pub use create_report_trait;

/// Where report files go and what happens to existing ones.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub file_prefix: String,
    pub directory: PathBuf,
    pub overwrite: bool,
}

impl ReportOptions {
    #[must_use]
    pub fn new() -> ReportOptions {
        ReportOptions {
            file_prefix: String::new(),
            directory: PathBuf::from("."),
            overwrite: false,
        }
    }

    pub fn file_prefix(&mut self, file_prefix: String) -> &mut ReportOptions {
        self.file_prefix = file_prefix;
        self
    }

    pub fn directory(&mut self, directory: PathBuf) -> &mut ReportOptions {
        self.directory = directory;
        self
    }

    pub fn overwrite(&mut self, overwrite: bool) -> &mut ReportOptions {
        self.overwrite = overwrite;
        self
    }
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self::new()
    }
}

struct ReportData {
    file_writers: RefCell<HashMap<TypeId, Writer<File>>>,
    config: ReportOptions,
}

// Registers a data container that stores
// * file_writers: Maps report type to file writer
// * config: Contains all the customizable filename options that the user supplies
define_data_plugin!(
    ReportPlugin,
    ReportData,
    ReportData {
        file_writers: RefCell::new(HashMap::default()),
        config: ReportOptions::new(),
    }
);

// Creates the file and any missing parent directories. Refuses to replace an
// existing file unless `overwrite` is set.
fn create_report_file(path: &Path, overwrite: bool) -> Result<File, SimError> {
    if path.exists() && !overwrite {
        return Err(SimError::ReportError(format!(
            "File already exists: {}. Please set `overwrite` to true in the file configuration and rerun.",
            path.display()
        )));
    }
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    Ok(File::create(path)?)
}

pub trait ContextReportExt {
    /// Options used by every later `add_report` call.
    fn report_options(&mut self) -> &mut ReportOptions;

    /// Opens `<directory>/<file_prefix><short_name>.csv` for reports of type `T`.
    ///
    /// # Errors
    ///
    /// Returns a `SimError` if the file exists and `overwrite` is off, or it
    /// cannot be created.
    fn add_report<T: Report + 'static>(&mut self, short_name: &str) -> Result<(), SimError>;

    fn has_report<T: Report + 'static>(&self) -> bool;

    /// Write a new row with columns following items in the report struct
    /// to the report file associated with the report type struct.
    ///
    /// # Panics
    ///
    /// Panics if no report of this type was added or the row cannot be written.
    fn send_report<T: Report>(&self, report: T);
}

impl ContextReportExt for Context {
    fn report_options(&mut self) -> &mut ReportOptions {
        &mut self.get_data_container_mut(ReportPlugin).config
    }

    fn add_report<T: Report + 'static>(&mut self, short_name: &str) -> Result<(), SimError> {
        let data_container = self.get_data_container_mut(ReportPlugin);
        let config = &data_container.config;
        let path = config
            .directory
            .join(format!("{}{short_name}.csv", config.file_prefix));
        let file = create_report_file(&path, config.overwrite)?;
        trace!("writing report {short_name} to {}", path.display());
        data_container
            .file_writers
            .get_mut()
            .insert(TypeId::of::<T>(), Writer::from_writer(file));
        Ok(())
    }

    fn has_report<T: Report + 'static>(&self) -> bool {
        self.get_data_container(ReportPlugin)
            .is_some_and(|data| data.file_writers.borrow().contains_key(&TypeId::of::<T>()))
    }

    fn send_report<T: Report>(&self, report: T) {
        // No data container will exist if no reports have been added
        let data_container = self
            .get_data_container(ReportPlugin)
            .expect("No writer found for the report type");
        let mut writer_cell = data_container.file_writers.borrow_mut();
        let writer = writer_cell
            .get_mut(&report.type_id())
            .expect("No writer found for the report type");
        report
            .serialize(writer)
            .unwrap_or_else(|error| panic!("Failed to write report row: {error}"));
        writer.flush().expect("Failed to flush writer");
    }
}

/// One row per day: how the message budget was used.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyDispatchReport {
    pub day: Day,
    pub phase: DispatchPhase,
    pub candidate_senders: usize,
    pub candidate_messages: usize,
    pub admitted_senders: usize,
    pub sent_messages: u64,
    pub daily_cap: u64,
    pub rejected_spacing: usize,
    pub rejected_cap: usize,
    pub rejected_lottery: usize,
}
create_report_trait!(DailyDispatchReport);

/// The cumulative risk-change histogram, one row per score per day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskChangeHistogramReport {
    pub day: Day,
    pub score: u32,
    pub count: u64,
}
create_report_trait!(RiskChangeHistogramReport);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiseaseStatusReport {
    pub day: Day,
    pub susceptible: usize,
    pub infected: usize,
    pub recovered: usize,
    pub dead: usize,
}
create_report_trait!(DiseaseStatusReport);

#[cfg(test)]
mod test {
    use super::*;
    use serde_derive::Deserialize;
    use tempfile::tempdir;

    #[derive(Serialize, Deserialize)]
    struct SampleReport {
        id: u32,
        value: String,
    }

    create_report_trait!(SampleReport);

    #[test]
    fn add_and_send_report() {
        let mut context = Context::new();
        let temp_dir = tempdir().unwrap();
        context
            .report_options()
            .directory(temp_dir.path().to_path_buf())
            .file_prefix("run1_".to_string());
        context.add_report::<SampleReport>("sample").unwrap();
        assert!(context.has_report::<SampleReport>());
        context.send_report(SampleReport {
            id: 1,
            value: "Value,1".to_string(),
        });
        context.send_report(SampleReport {
            id: 2,
            value: "Value\n2".to_string(),
        });

        let file_path = temp_dir.path().join("run1_sample.csv");
        let mut reader = csv::Reader::from_path(file_path).unwrap();
        let records: Vec<SampleReport> = reader.deserialize().map(Result::unwrap).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].value, "Value,1");
        assert_eq!(records[1].id, 2);
        assert_eq!(records[1].value, "Value\n2");
    }

    #[test]
    fn directory_is_created() {
        let mut context = Context::new();
        let temp_dir = tempdir().unwrap();
        let nested = temp_dir.path().join("nested").join("output");
        context.report_options().directory(nested.clone());
        context.add_report::<SampleReport>("sample").unwrap();
        assert!(nested.join("sample.csv").exists());
    }

    #[test]
    fn existing_file_needs_overwrite() {
        let temp_dir = tempdir().unwrap();
        std::fs::write(temp_dir.path().join("sample.csv"), "old").unwrap();

        let mut context = Context::new();
        context.report_options().directory(temp_dir.path().to_path_buf());
        let error = context.add_report::<SampleReport>("sample").unwrap_err();
        assert!(matches!(error, SimError::ReportError(_)));

        context.report_options().overwrite(true);
        context.add_report::<SampleReport>("sample").unwrap();
    }

    #[test]
    #[should_panic(expected = "No writer found for the report type")]
    fn send_report_without_adding_report() {
        let context = Context::new();
        assert!(!context.has_report::<SampleReport>());
        context.send_report(SampleReport {
            id: 1,
            value: "Test Value".to_string(),
        });
    }

    #[test]
    fn dispatch_rows_serialize_phase_names() {
        let mut context = Context::new();
        let temp_dir = tempdir().unwrap();
        context.report_options().directory(temp_dir.path().to_path_buf());
        context.add_report::<DailyDispatchReport>("dispatch").unwrap();
        context.send_report(DailyDispatchReport {
            day: 3,
            phase: DispatchPhase::BurnIn,
            candidate_senders: 4,
            candidate_messages: 9,
            admitted_senders: 0,
            sent_messages: 0,
            daily_cap: 50,
            rejected_spacing: 0,
            rejected_cap: 0,
            rejected_lottery: 0,
        });
        let contents = std::fs::read_to_string(temp_dir.path().join("dispatch.csv")).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next(),
            Some("day,phase,candidate_senders,candidate_messages,admitted_senders,sent_messages,daily_cap,rejected_spacing,rejected_cap,rejected_lottery")
        );
        assert_eq!(lines.next(), Some("3,burn_in,4,9,0,0,50,0,0,0"));
    }
}

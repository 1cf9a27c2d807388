//! CsvExampleGen: ingesta de CSV externos en splits train/eval.
//!
//! Todas las filas de todos los `*.csv` bajo `input_base` (misma cabecera)
//! se reparten por posición en cubetas 2:1 (train:eval).

use log::info;
use pipe_core::{Component, ComponentOutputs, ComponentRunResult, ExecutionContext};

use super::{finish, output_dir, single_input};
use crate::artifacts::{ExamplesArtifact, SPLIT_DATA_FILE};
use crate::error::AdapterError;
use crate::table::{csv_files, Table};

pub const TRAIN_SPLIT: &str = "train";
pub const EVAL_SPLIT: &str = "eval";

const TRAIN_BUCKETS: usize = 2;
const EVAL_BUCKETS: usize = 1;

#[derive(Debug, Default)]
pub struct CsvExampleGen;

impl CsvExampleGen {
    fn generate(ctx: &ExecutionContext<'_>) -> Result<ComponentOutputs, AdapterError> {
        let source = single_input(ctx, "input_base")?;
        let files = csv_files(std::path::Path::new(&source.uri))?;
        let mut merged: Option<Table> = None;
        for file in &files {
            let table = Table::read(file)?;
            match merged.as_mut() {
                None => merged = Some(table),
                Some(acc) if acc.columns == table.columns => acc.rows.extend(table.rows),
                Some(_) => {
                    return Err(AdapterError::Format { path: file.clone(),
                                                      line: 1,
                                                      message: "header differs from previous files".into() })
                }
            }
        }
        let table = merged.filter(|t| !t.is_empty())
                          .ok_or_else(|| AdapterError::Invalid(format!("no rows found under {}", source.uri)))?;

        let mut train = Table::new(table.columns.clone());
        let mut eval = Table::new(table.columns.clone());
        for (i, row) in table.rows.iter().enumerate() {
            if i % (TRAIN_BUCKETS + EVAL_BUCKETS) < TRAIN_BUCKETS {
                train.rows.push(row.clone());
            } else {
                eval.rows.push(row.clone());
            }
        }
        if eval.is_empty() {
            return Err(AdapterError::Invalid(format!("{} rows are not enough for an eval split", table.len())));
        }

        let dir = output_dir(ctx, "examples")?;
        train.write(&dir.join(TRAIN_SPLIT).join(SPLIT_DATA_FILE))?;
        eval.write(&dir.join(EVAL_SPLIT).join(SPLIT_DATA_FILE))?;
        info!("CsvExampleGen: {} files, {} rows (train={}, eval={})",
              files.len(),
              table.len(),
              train.len(),
              eval.len());

        let artifact = ExamplesArtifact { num_rows: table.len() as u64,
                                          columns: table.columns,
                                          splits: [(TRAIN_SPLIT.to_string(), train.len() as u64),
                                                   (EVAL_SPLIT.to_string(), eval.len() as u64)].into_iter()
                                                                                               .collect(),
                                          schema_version: 1 };
        Ok(ComponentOutputs::new().typed("examples", artifact)?)
    }
}

impl Component for CsvExampleGen {
    fn run(&self, ctx: &ExecutionContext<'_>) -> ComponentRunResult {
        finish(ctx, Self::generate(ctx))
    }
}

use std::path::Path;

use derive_more::Display;
use log::info;

use crate::{
    config::{Config, Scalars},
    parse::{ParseTableError, Table},
};

/// The six parameter tables of a planning problem
#[derive(Debug, Clone, PartialEq)]
pub struct Tables {
    /// final products x periods
    pub demand: Table,
    /// semi products x raw materials: raw material used per unit of semi product
    pub bom_semi: Table,
    /// final products x semi products: semi products used per unit of final product
    pub bom_final: Table,
    /// raw materials x periods
    pub raw_price: Table,
    /// final products x periods
    pub final_price: Table,
    /// semi products x periods
    pub semi_price: Table,
}

#[derive(Debug, Display)]
pub enum ProblemConstructionError {
    /// One of the input tables could not be read
    #[display(fmt = "failed to read {}: {}", file, source)]
    Table {
        file: String,
        source: ParseTableError,
    },
    /// The planning horizon must contain at least one period
    #[display(fmt = "the planning horizon has no periods")]
    NoPeriods,
    /// A table does not contain an entry the other tables require
    #[display(fmt = "table {} has no entry for ({}, {})", table, row, column)]
    MissingLabel {
        table: &'static str,
        row: String,
        column: String,
    },
}

impl std::error::Error for ProblemConstructionError {}

/// A validated multi-echelon production planning problem.
#[derive(Debug, Clone, PartialEq)]
pub struct Problem {
    /// Period labels, in planning order
    periods: Vec<String>,
    /// Labels of the final products
    finals: Vec<String>,
    /// Labels of the semi products
    semis: Vec<String>,
    /// Labels of the raw materials
    raws: Vec<String>,
    tables: Tables,
    scalars: Scalars,
}

impl Problem {
    /// Read the tables named in `config` from `data_dir` and validate them.
    pub fn load<P: AsRef<Path>>(
        data_dir: P,
        config: &Config,
    ) -> Result<Problem, ProblemConstructionError> {
        let dir = data_dir.as_ref();
        let counts = &config.counts;
        let files = &config.files;

        let read = |file: &str, rows: usize, columns: usize| {
            Table::read(dir.join(file), rows, columns).map_err(|source| {
                ProblemConstructionError::Table {
                    file: file.to_string(),
                    source,
                }
            })
        };

        let tables = Tables {
            demand: read(&files.demand, counts.final_products, counts.periods)?,
            bom_semi: read(&files.bom_semi, counts.semi_products, counts.raw_materials)?,
            bom_final: read(&files.bom_final, counts.final_products, counts.semi_products)?,
            raw_price: read(&files.raw_price, counts.raw_materials, counts.periods)?,
            final_price: read(&files.final_price, counts.final_products, counts.periods)?,
            semi_price: read(&files.semi_price, counts.semi_products, counts.periods)?,
        };

        let problem = Problem::new(tables, config.parameters.clone())?;
        info!(
            "Loaded problem with {} periods, {} final products, {} semi products and {} raw materials",
            problem.periods.len(),
            problem.finals.len(),
            problem.semis.len(),
            problem.raws.len()
        );
        Ok(problem)
    }

    /// Validate that the tables agree on their labels.
    ///
    /// Periods and final products are taken from the demand table, semi products and
    /// raw materials from the semi product bill of materials.
    pub fn new(tables: Tables, scalars: Scalars) -> Result<Problem, ProblemConstructionError> {
        let periods = tables.demand.columns().to_vec();
        let finals = tables.demand.rows().to_vec();
        let semis = tables.bom_semi.rows().to_vec();
        let raws = tables.bom_semi.columns().to_vec();

        if periods.is_empty() {
            return Err(ProblemConstructionError::NoPeriods);
        }

        let checks: [(&'static str, &Table, &[String], &[String]); 5] = [
            ("bom_final", &tables.bom_final, &finals, &semis),
            ("raw_price", &tables.raw_price, &raws, &periods),
            ("final_price", &tables.final_price, &finals, &periods),
            ("semi_price", &tables.semi_price, &semis, &periods),
            ("demand", &tables.demand, &finals, &periods),
        ];

        for (name, table, rows, columns) in checks {
            for row in rows {
                for column in columns {
                    if table.get(row, column).is_none() {
                        return Err(ProblemConstructionError::MissingLabel {
                            table: name,
                            row: row.clone(),
                            column: column.clone(),
                        });
                    }
                }
            }
        }

        Ok(Problem {
            periods,
            finals,
            semis,
            raws,
            tables,
            scalars,
        })
    }

    /// Period labels, in planning order
    pub fn periods(&self) -> &[String] {
        &self.periods
    }

    /// Labels of the final products
    pub fn finals(&self) -> &[String] {
        &self.finals
    }

    /// Labels of the semi products
    pub fn semis(&self) -> &[String] {
        &self.semis
    }

    /// Labels of the raw materials
    pub fn raws(&self) -> &[String] {
        &self.raws
    }

    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    pub fn scalars(&self) -> &Scalars {
        &self.scalars
    }
}

use crate::support::*;
use std::sync::Arc;
use strata_db_core::schema::catalog::{OnDeleteAction, Table};
use strata_db_core::schema::ddl::{
    AlterTable, AlterTableAction, CheckDef, ColumnDef, DropObject,
};
use strata_db_core::types::datatype::DataType;
use strata_db_core::{DdlStatement, Error, MutationOp, SchemaVersion};

mod ddl_errors;
mod indexes;
mod lookups;
mod versions;

//! docrender: renders HTML into DOCX and sheet data into XLSX over HTTP.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;

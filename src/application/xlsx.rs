//! JSON sheet definitions to XLSX delegate.

use docrender_api_types::{CellValue, SheetDefinition, WorkbookRenderRequest};
use rust_xlsxwriter::{DocProperties, Workbook, Worksheet, XlsxError};

use crate::application::render::{DocumentDelegate, FailurePolicy, RenderError};
use crate::domain::documents::{DocumentKind, WorksheetNames};

/// Builds a workbook with one worksheet per sheet definition, in order.
///
/// There is no fallback: any library error is reported to the caller.
#[derive(Debug, Default, Clone, Copy)]
pub struct XlsxRenderer;

impl XlsxRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentDelegate for XlsxRenderer {
    type Input = WorkbookRenderRequest;

    fn kind(&self) -> DocumentKind {
        DocumentKind::Xlsx
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::Propagate
    }

    fn check(&self, input: &WorkbookRenderRequest) -> Result<(), RenderError> {
        if input.sheets.is_empty() {
            return Err(RenderError::invalid_input("At least one sheet is required"));
        }
        Ok(())
    }

    fn render(&self, input: &WorkbookRenderRequest) -> Result<Vec<u8>, RenderError> {
        build_workbook(input).map_err(RenderError::assembly)
    }
}

fn build_workbook(input: &WorkbookRenderRequest) -> Result<Vec<u8>, String> {
    // Workbook::new starts with no worksheets, so only caller sheets are emitted.
    let mut workbook = Workbook::new();
    workbook.set_properties(&DocProperties::new().set_title(&input.title));

    let mut names = WorksheetNames::new();
    for sheet in &input.sheets {
        let worksheet = workbook.add_worksheet();
        worksheet
            .set_name(names.assign(&sheet.name))
            .map_err(xlsx_error_text)?;
        write_sheet(worksheet, sheet)?;
    }

    workbook.save_to_buffer().map_err(xlsx_error_text)
}

fn write_sheet(worksheet: &mut Worksheet, sheet: &SheetDefinition) -> Result<(), String> {
    let mut row_idx = 0usize;

    if !sheet.headers.is_empty() {
        for (col_idx, header) in sheet.headers.iter().enumerate() {
            worksheet
                .write_string(cast_row_num(row_idx)?, cast_col_num(col_idx)?, header)
                .map_err(xlsx_error_text)?;
        }
        row_idx += 1;
    }

    for row in &sheet.rows {
        for (col_idx, value) in row.iter().enumerate() {
            write_cell(worksheet, row_idx, col_idx, value)?;
        }
        row_idx += 1;
    }
    Ok(())
}

fn write_cell(
    worksheet: &mut Worksheet,
    row_idx: usize,
    col_idx: usize,
    value: &CellValue,
) -> Result<(), String> {
    match value {
        CellValue::Empty => {}
        CellValue::Text(text) => {
            worksheet
                .write_string(cast_row_num(row_idx)?, cast_col_num(col_idx)?, text)
                .map_err(xlsx_error_text)?;
        }
        CellValue::Number(number) => {
            worksheet
                .write_number(cast_row_num(row_idx)?, cast_col_num(col_idx)?, *number)
                .map_err(xlsx_error_text)?;
        }
    }
    Ok(())
}

fn xlsx_error_text(err: XlsxError) -> String {
    err.to_string()
}

fn cast_row_num(value: usize) -> Result<u32, String> {
    u32::try_from(value).map_err(|_| format!("row index overflow: {value}"))
}

fn cast_col_num(value: usize) -> Result<u16, String> {
    u16::try_from(value).map_err(|_| format!("column index overflow: {value}"))
}

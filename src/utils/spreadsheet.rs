// Workbook codec for the admin console: reads the bulk-import upload and
// writes the roster export.

use crate::models::User;
use crate::services::material_validator::MATERIALS_PER_STUDENT;
use crate::utils::AppError;
use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use rust_xlsxwriter::{Format, Workbook};
use std::io::Cursor;

pub const EXPORT_SHEET_NAME: &str = "Students Data";
pub const EXPORT_FILE_NAME: &str = "Student_Data_Export.xlsx";
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// One sheet row with its 1-based row number as shown in Excel
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRow {
    pub number: usize,
    pub cells: Vec<String>,
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string().trim().to_string(),
    }
}

/// Reads every row of the first worksheet as trimmed strings.
/// Column A is always index 0, even when leading columns are empty.
pub fn read_first_sheet(bytes: &[u8]) -> Result<Vec<SheetRow>, AppError> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e: calamine::XlsxError| AppError::SpreadsheetRead(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::SpreadsheetRead("workbook has no sheets".to_string()))?
        .map_err(|e| AppError::SpreadsheetRead(e.to_string()))?;

    let (start_row, start_col) = range.start().unwrap_or((0, 0));

    Ok(range
        .rows()
        .enumerate()
        .map(|(offset, row)| {
            let mut cells = vec![String::new(); start_col as usize];
            cells.extend(row.iter().map(cell_to_string));
            SheetRow {
                number: start_row as usize + offset + 1,
                cells,
            }
        })
        .collect())
}

fn status_label(user: &User) -> &'static str {
    if user.has_submitted {
        "Submitted"
    } else {
        "Pending"
    }
}

/// Builds the export workbook: name, email, status, then one column per material
pub fn write_export(users: &[User]) -> Result<Vec<u8>, AppError> {
    let write_err = |e: rust_xlsxwriter::XlsxError| AppError::SpreadsheetWrite(e.to_string());

    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(EXPORT_SHEET_NAME).map_err(write_err)?;

    let mut titles = vec![
        "Student Name".to_string(),
        "Email ID".to_string(),
        "Status".to_string(),
    ];
    titles.extend((1..=MATERIALS_PER_STUDENT).map(|i| format!("Material {}", i)));

    for (col, title) in titles.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, title.as_str(), &header)
            .map_err(write_err)?;
    }

    worksheet.set_column_width(0, 20.0).map_err(write_err)?;
    worksheet.set_column_width(1, 30.0).map_err(write_err)?;
    worksheet.set_column_width(2, 10.0).map_err(write_err)?;

    for (index, user) in users.iter().enumerate() {
        let row = index as u32 + 1;
        worksheet
            .write_string(row, 0, user.name.as_str())
            .map_err(write_err)?;
        worksheet
            .write_string(row, 1, user.email.as_str())
            .map_err(write_err)?;
        worksheet
            .write_string(row, 2, status_label(user))
            .map_err(write_err)?;

        for slot in 0..MATERIALS_PER_STUDENT {
            let material = user.materials.get(slot).map(String::as_str).unwrap_or("");
            worksheet
                .write_string(row, 3 + slot as u16, material)
                .map_err(write_err)?;
        }
    }

    workbook.save_to_buffer().map_err(write_err)
}

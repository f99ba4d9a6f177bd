use chrono::Local;
use gridgate_core::Row;

use crate::error::ApiError;

/// `{table}_{yyyyMMddHHmmss}.csv`
pub fn export_file_name(table: &str) -> String {
    format!("{}_{}.csv", table, Local::now().format("%Y%m%d%H%M%S"))
}

/// Render rows as CSV. The header comes from the first row's columns;
/// later rows are written in that column order, missing cells left empty.
pub fn rows_to_csv(rows: &[Row]) -> Result<Vec<u8>, ApiError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    if let Some(first) = rows.first() {
        let header: Vec<&str> = first.columns().collect();
        writer.write_record(&header).map_err(csv_error)?;

        for row in rows {
            let record: Vec<String> = header
                .iter()
                .map(|col| row.get(col).map(|v| v.to_string()).unwrap_or_default())
                .collect();
            writer.write_record(&record).map_err(csv_error)?;
        }
    }

    writer
        .into_inner()
        .map_err(|e| ApiError::Internal(format!("CSV flush failed: {}", e)))
}

fn csv_error(err: csv::Error) -> ApiError {
    ApiError::Internal(format!("CSV write failed: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridgate_core::SqlValue;

    #[test]
    fn test_rows_to_csv() {
        let mut a = Row::new();
        a.set("id", SqlValue::Integer(1));
        a.set("名称", SqlValue::from("apple, red"));
        a.set("price", SqlValue::Null);
        let mut b = Row::new();
        b.set("id", SqlValue::Integer(2));
        b.set("名称", SqlValue::from("pear"));

        let text = String::from_utf8(rows_to_csv(&[a, b]).unwrap()).unwrap();
        assert_eq!(text, "id,名称,price\n1,\"apple, red\",\n2,pear,\n");
    }

    #[test]
    fn test_empty_export() {
        assert!(rows_to_csv(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_file_name_shape() {
        let name = export_file_name("t_product");
        assert!(name.starts_with("t_product_"));
        assert!(name.ends_with(".csv"));
        assert_eq!(name.len(), "t_product_".len() + 14 + 4);
    }
}

//! `extractflow inspect`: schema, row count and fingerprint of an extract

use std::path::PathBuf;

use anyhow::Result;
use extractflow::RefreshError;
use extractflow_sinks::{inspect_extract, read_extract};
use serde_json::json;

use crate::cli::error::HelpfulError;
use crate::cli::output::{color_for_type, format_size, print_table, print_table_colored};

#[derive(Debug)]
pub struct InspectArgs {
    pub path: PathBuf,
    /// Also print the first N rows.
    pub rows: Option<usize>,
    pub json: bool,
}

pub fn run(args: InspectArgs) -> Result<()> {
    if !args.path.exists() {
        return Err(HelpfulError::file_not_found(&args.path).into());
    }
    let summary = inspect_extract(&args.path)
        .map_err(|err| HelpfulError::from(RefreshError::Extract(err)))?;
    let preview = match args.rows {
        Some(limit) => {
            let extract = read_extract(&args.path)
                .map_err(|err| HelpfulError::from(RefreshError::Extract(err)))?;
            Some(extract.rows.into_iter().take(limit).collect::<Vec<_>>())
        }
        None => None,
    };

    if args.json {
        let columns: Vec<_> = summary
            .schema
            .columns()
            .iter()
            .map(|c| json!({ "name": c.name, "type": c.column_type.as_str() }))
            .collect();
        let mut doc = json!({
            "path": summary.path.display().to_string(),
            "table": summary.schema.table().to_string(),
            "columns": columns,
            "rows": summary.num_rows,
            "fingerprint": summary.fingerprint,
            "size_bytes": summary.size_bytes,
        });
        if let Some(rows) = &preview {
            let rendered: Vec<Vec<String>> = rows
                .iter()
                .map(|row| row.iter().map(|v| v.to_string()).collect())
                .collect();
            doc["preview"] = json!(rendered);
        }
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!("Extract: {}", summary.path.display());
    println!("Table:   {}", summary.schema.table());
    println!("Rows:    {}", summary.num_rows);
    println!("Size:    {}", format_size(summary.size_bytes));
    println!("Fingerprint: {}", summary.fingerprint);
    println!();

    let columns = summary
        .schema
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, c)| {
            vec![
                ((idx + 1).to_string(), None),
                (c.name.clone(), None),
                (c.column_type.to_string(), Some(color_for_type(c.column_type))),
            ]
        })
        .collect();
    print_table_colored(&["#", "Column", "Type"], columns);

    if let Some(rows) = preview {
        let headers: Vec<&str> = summary.schema.column_names().collect();
        let rendered = rows
            .iter()
            .map(|row| row.iter().map(|v| v.to_string()).collect())
            .collect();
        println!();
        print_table(&headers, rendered);
    }
    Ok(())
}

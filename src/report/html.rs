//! HTML report assembly
//!
//! Plain string output, no template engine. Fragment order is fixed:
//! preamble, header row, one row per CSV record, footer. Every container the
//! preamble opens is closed once by the footer.

use crate::layout::{LOGO_FILE, MEDIA_DIR};
use crate::report::render::RenderedRow;
use crate::report::ReportMetadata;
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use std::io::{self, Write};

/// Build the whole document in memory.
pub fn assemble<'a, I>(metadata: &ReportMetadata, columns: &[String], rows: I) -> String
where
    I: IntoIterator<Item = &'a RenderedRow>,
{
    let mut buf = Vec::new();
    // Writing into a Vec can't fail
    let _ = write(&mut buf, metadata, columns, rows);
    String::from_utf8_lossy(&buf).into_owned()
}

pub fn write<'a, W, I>(writer: &mut W, metadata: &ReportMetadata, columns: &[String], rows: I) -> io::Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a RenderedRow>,
{
    write_preamble(writer, metadata)?;
    write_header(writer, columns)?;
    for row in rows {
        write_row(writer, row)?;
    }
    write_footer(writer, metadata)
}

fn write_preamble<W: Write>(writer: &mut W, metadata: &ReportMetadata) -> io::Result<()> {
    write!(writer, r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>
        body {{
            font-family: Arial, sans-serif;
            text-align: center;
        }}
        .logo {{ margin-top: 20px; }}
        .title, .case {{ margin: 20px 0; }}
        .analyst {{ margin-bottom: 20px; }}
        .table-container {{
            margin: 0 auto;
            width: 100%;
            text-align: left;
        }}
        table {{
            width: 100%;
            border-collapse: collapse;
            margin-top: 20px;
        }}
        th, td {{
            border: 4px solid gray;
            padding: 8px;
            text-align: left;
        }}
        th {{ background-color: #D6EAF8; }}
        td img {{
            width: 150px;
            height: auto;
        }}
        tr.unmatched td {{ background-color: #FDEDEC; }}
        .footer {{
            margin: 20px 0;
            color: gray;
            font-size: 0.85rem;
        }}
    </style>
</head>
<body>
    <div class="logo">
        <img src="{logo}" alt="Logo" style="width: 200px; height: auto;">
    </div>
    <div class="title">
        <h2>{title}</h2>
    </div>
    <div class="case">
        <h2>{case}    Item {item}</h2>
    </div>
    <div class="analyst">
        <p>{analyst}</p>
    </div>
    <div class="table-container">
        <table>
"#,
        title = text(&metadata.title),
        logo = attr(&format!("{}/{}", MEDIA_DIR, LOGO_FILE)),
        case = text(&metadata.case_number),
        item = text(&metadata.item_number),
        analyst = text(&metadata.analyst),
    )
}

fn write_header<W: Write>(writer: &mut W, columns: &[String]) -> io::Result<()> {
    write!(writer, "            <tr><th>#</th><th>Video</th>")?;
    for column in columns {
        write!(writer, "<th>{}</th>", text(column))?;
    }
    writeln!(writer, "</tr>")
}

fn write_row<W: Write>(writer: &mut W, row: &RenderedRow) -> io::Result<()> {
    if row.is_matched() {
        write!(writer, "            <tr>")?;
    } else {
        write!(writer, r#"            <tr class="unmatched">"#)?;
    }
    write!(writer, "<td>{}</td>", row.id)?;

    let img = format!(r#"<img src="{}" alt="">"#, attr(&row.thumbnail_link));
    match &row.media_link {
        Some(link) => write!(writer, r#"<td><a href="{}">{}</a></td>"#, attr(link), img)?,
        None => write!(writer, "<td>{}</td>", img)?,
    }

    for cell in &row.cells {
        write!(writer, "<td>{}</td>", text(cell))?;
    }
    writeln!(writer, "</tr>")
}

fn write_footer<W: Write>(writer: &mut W, metadata: &ReportMetadata) -> io::Result<()> {
    write!(writer, r#"        </table>
    </div>
    <div class="footer">Generated {generated}</div>
</body>
</html>
"#,
        generated = text(&metadata.generated),
    )
}

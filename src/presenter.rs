use crate::prelude::*;

use crate::coordinator::PollRow;

use serde_json::json;

/// Receives the rows of each completed poll pass.
pub trait Presenter: Send {
    fn present(&mut self, space: AddressSpace, rows: &[PollRow]) -> Result<()>;
}

/// Aligned text columns: address, description, value, trend, hex.
pub struct TablePresenter<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> TablePresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> Presenter for TablePresenter<W> {
    fn present(&mut self, space: AddressSpace, rows: &[PollRow]) -> Result<()> {
        let description_width = rows
            .iter()
            .map(|row| row.description.chars().count())
            .max()
            .unwrap_or(0)
            .max("Description".len());
        let value_width = rows
            .iter()
            .map(|row| row.display().chars().count())
            .max()
            .unwrap_or(0)
            .max("Value".len());

        let polled_at = rows
            .first()
            .map(|row| row.polled_at.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        writeln!(self.out, "== {} registers {} ==", space, polled_at)?;
        writeln!(
            self.out,
            "{:<7} {:<dw$} {:<vw$} T Hex",
            "Address",
            "Description",
            "Value",
            dw = description_width,
            vw = value_width
        )?;

        for row in rows {
            writeln!(
                self.out,
                "0x{:04X}  {:<dw$} {:<vw$} {} {}",
                row.address,
                row.description,
                row.display(),
                row.trend.marker(),
                row.hex_text(),
                dw = description_width,
                vw = value_width
            )?;
        }
        writeln!(self.out)?;
        self.out.flush()?;

        Ok(())
    }
}

/// One JSON object per row, one row per line.
pub struct JsonPresenter<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> JsonPresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> Presenter for JsonPresenter<W> {
    fn present(&mut self, _space: AddressSpace, rows: &[PollRow]) -> Result<()> {
        for row in rows {
            let line = json!({
                "time": row.polled_at.to_rfc3339(),
                "space": row.space,
                "address": format!("0x{:04X}", row.address),
                "description": row.description,
                "value": row.display(),
                "numeric": row.value().and_then(|value| value.numeric()),
                "trend": row.trend,
                "raw": row.raw_text(),
                "hex": row.hex_text(),
            });
            serde_json::to_writer(&mut self.out, &line)?;
            writeln!(self.out)?;
        }
        self.out.flush()?;

        Ok(())
    }
}

pub fn for_output(output: config::Output) -> Box<dyn Presenter> {
    match output {
        config::Output::Table => Box::new(TablePresenter::new(std::io::stdout())),
        config::Output::Json => Box::new(JsonPresenter::new(std::io::stdout())),
    }
}

use crate::protocol::DELIMITER;
use ndarray::{Array1, ArrayBase, ArrayView1, Data, Dimension, Ix1};
use polars::prelude::*;
use std::fmt::Write as _;
use std::path::Path;

pub const VOLTAGE_COLUMN_NAME: &str = "v";
pub const TIME_COLUMN_NAME: &str = "t";

/// The two sample arrays that make up a waveform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Voltage,
    Time,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Voltage => "voltage",
            Signal::Time => "time",
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("{signal} array is not one-dimensional ({ndim} non-singleton axes)")]
    NotOneDimensional { signal: Signal, ndim: usize },

    #[error("voltage and time arrays are not of equal lengths ({voltage} vs {time})")]
    LengthMismatch { voltage: usize, time: usize },

    #[error("{signal} array holds a non-finite sample at index {index}")]
    NonFinite { signal: Signal, index: usize },

    #[error("{signal} array is empty")]
    Empty { signal: Signal },

    #[error("{signal} column contains {nulls} missing value(s)")]
    MissingValues { signal: Signal, nulls: usize },

    #[error("Failed to read waveform file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse waveform table: {0}")]
    Table(#[from] PolarsError),
}

/// A validated voltage/time pair.
///
/// Both arrays are one-dimensional, non-empty and of equal length. A `Waveform` is
/// never modified after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    voltage: Array1<f64>,
    time: Array1<f64>,
}

impl Waveform {
    /// Validate a voltage and a time array of any shape.
    ///
    /// Singleton axes are squeezed away first, so `(1, n)` and `(n, 1)` arrays are
    /// accepted as if they were flat. NaN and infinite samples are rejected.
    pub fn new<S1, D1, S2, D2>(
        voltage: &ArrayBase<S1, D1>,
        time: &ArrayBase<S2, D2>,
    ) -> Result<Self, InputError>
    where
        S1: Data<Elem = f64>,
        D1: Dimension,
        S2: Data<Elem = f64>,
        D2: Dimension,
    {
        let voltage = squeeze(voltage, Signal::Voltage)?;
        let time = squeeze(time, Signal::Time)?;

        if voltage.len() != time.len() {
            return Err(InputError::LengthMismatch {
                voltage: voltage.len(),
                time: time.len(),
            });
        }
        if voltage.is_empty() {
            return Err(InputError::Empty {
                signal: Signal::Voltage,
            });
        }

        Ok(Self { voltage, time })
    }

    /// Load a waveform from a CSV file with `v` and `t` columns.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self, InputError> {
        let file = std::fs::File::open(path.as_ref())?;
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .into_reader_with_file_handle(file)
            .finish()?
            .lazy()
            .select([
                col(VOLTAGE_COLUMN_NAME).cast(DataType::Float64),
                col(TIME_COLUMN_NAME).cast(DataType::Float64),
            ])
            .collect()?;

        Self::from_dataframe(&df)
    }

    /// Build a waveform from the `v` and `t` columns of a frame.
    pub fn from_dataframe(df: &DataFrame) -> Result<Self, InputError> {
        let voltage = column_values(df, VOLTAGE_COLUMN_NAME, Signal::Voltage)?;
        let time = column_values(df, TIME_COLUMN_NAME, Signal::Time)?;
        Self::new(&voltage, &time)
    }

    /// Frame with `t` and `v` columns, e.g. for plotting.
    pub fn to_dataframe(&self) -> Result<DataFrame, PolarsError> {
        let time: Column = Series::new(TIME_COLUMN_NAME.into(), self.time.to_vec()).into();
        let voltage: Column =
            Series::new(VOLTAGE_COLUMN_NAME.into(), self.voltage.to_vec()).into();
        DataFrame::new(vec![time, voltage])
    }

    pub fn voltage(&self) -> ArrayView1<'_, f64> {
        self.voltage.view()
    }

    pub fn time(&self) -> ArrayView1<'_, f64> {
        self.time.view()
    }

    pub fn len(&self) -> usize {
        self.voltage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voltage.is_empty()
    }

    /// Encoded voltage and time buffers, in upload order.
    pub fn encode(&self) -> (String, String) {
        (convert_buffer(&self.voltage), convert_buffer(&self.time))
    }
}

/// Drop singleton axes and flatten, failing if more than one axis remains.
fn squeeze<S, D>(array: &ArrayBase<S, D>, signal: Signal) -> Result<Array1<f64>, InputError>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    let ndim = array.shape().iter().filter(|&&len| len != 1).count();
    if ndim > 1 {
        return Err(InputError::NotOneDimensional { signal, ndim });
    }
    if let Some(index) = array.iter().position(|sample| !sample.is_finite()) {
        return Err(InputError::NonFinite { signal, index });
    }
    Ok(array.iter().copied().collect())
}

fn column_values(df: &DataFrame, name: &str, signal: Signal) -> Result<Array1<f64>, InputError> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    let values = column.f64()?;

    let nulls = values.null_count();
    if nulls > 0 {
        return Err(InputError::MissingValues { signal, nulls });
    }

    Ok(values.into_no_null_iter().collect())
}

/// Render samples as comma-delimited decimal text with no trailing delimiter.
///
/// Each value uses the shortest representation that parses back to the same `f64`,
/// always with a decimal point or exponent (`0.0`, `1.5`, `0.001`, `1e-7`).
pub fn convert_buffer<S>(samples: &ArrayBase<S, Ix1>) -> String
where
    S: Data<Elem = f64>,
{
    #[cfg(feature = "cpu-profiling")]
    let _zone = tracy_client::Client::running()
        .map(|client| client.span(tracy_client::span_location!("convert_buffer"), 0));

    let mut buffer = String::with_capacity(samples.len() * 8);
    for (i, value) in samples.iter().enumerate() {
        if i > 0 {
            buffer.push(DELIMITER);
        }
        write!(buffer, "{value:?}").ok();
    }
    buffer
}

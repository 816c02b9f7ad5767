use crate::telemetry_record::TelemetryRecord;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{Gauge, GaugeVec, Opts, Registry};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

// Positions within the `Data` array
const INPUT_CURRENT_1: usize = 0;
const INPUT_CURRENT_2: usize = 1;
const INPUT_VOLTAGE_1: usize = 2;
const INPUT_VOLTAGE_2: usize = 3;
const OUTPUT_CURRENT: usize = 4;
const OUTPUT_VOLTAGE: usize = 5;
const OUTPUT_POWER: usize = 6;
const TOTAL_ENERGY: usize = 9;
const GRID_FREQUENCY: usize = 50;

/// Latest measurements derived from the inverter, shared between ingestion and scraping.
///
/// Clones are handles onto the same values. Every field is an atomic gauge so
/// the scrape path never waits on ingestion. Output voltage, energy total and
/// grid frequency are only exposed while the inverter reports a grid frequency;
/// hiding them keeps their last values rather than zeroing them.
#[derive(Clone)]
pub struct MeasurementSet {
    input_current: GaugeVec,
    input_voltage: GaugeVec,
    input_current_arrays: [Gauge; 2],
    input_voltage_arrays: [Gauge; 2],
    output_current: Gauge,
    output_power: Gauge,
    output_voltage: Gauge,
    total_energy: Gauge,
    grid_frequency: Gauge,
    grid_tied: Arc<AtomicBool>,
}

/// Point-in-time copy of a [`MeasurementSet`]. Grid-tied values are `None` while suppressed.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementSnapshot {
    pub input_current: [f64; 2],
    pub input_voltage: [f64; 2],
    pub output_current: f64,
    pub output_power: f64,
    pub output_voltage: Option<f64>,
    pub total_energy: Option<f64>,
    pub grid_frequency: Option<f64>,
}

impl MeasurementSet {
    pub fn new() -> Result<Self, prometheus::Error> {
        let input_current = GaugeVec::new(
            Opts::new(
                "input_current_ampere",
                "Current current provided by PV to the inverter, partitioned by array.",
            ),
            &["array"],
        )?;
        let input_voltage = GaugeVec::new(
            Opts::new(
                "input_voltage",
                "Current voltage provided by PV to the inverter, partitioned by array.",
            ),
            &["array"],
        )?;
        let input_current_arrays = [
            input_current.with_label_values(&["1"]),
            input_current.with_label_values(&["2"]),
        ];
        let input_voltage_arrays = [
            input_voltage.with_label_values(&["1"]),
            input_voltage.with_label_values(&["2"]),
        ];

        Ok(Self {
            input_current,
            input_voltage,
            input_current_arrays,
            input_voltage_arrays,
            output_current: Gauge::with_opts(Opts::new(
                "output_current_ampere",
                "Current current provided by the inverter to the grid.",
            ))?,
            output_power: Gauge::with_opts(Opts::new(
                "output_power_watt",
                "Current power provided by the inverter to the grid.",
            ))?,
            output_voltage: Gauge::with_opts(Opts::new(
                "output_voltage",
                "Current voltage provided by the inverter to the grid.",
            ))?,
            total_energy: Gauge::with_opts(Opts::new(
                "total_energy_kwh",
                "The total energy provided by this inverter.",
            ))?,
            grid_frequency: Gauge::with_opts(Opts::new(
                "grid_frequency_hertz",
                "Current frequency detected in the grid.",
            ))?,
            grid_tied: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Registers this set with `registry` as a single collector
    pub fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.clone()))
    }

    /// Updates measurements from `record`.
    ///
    /// Records with fewer than [`MIN_READINGS`](crate::telemetry_record::MIN_READINGS)
    /// readings are ignored entirely, including the fields that would be in range.
    pub fn apply(&self, record: &TelemetryRecord) {
        if !record.is_complete() {
            debug!(
                readings = record.readings.len(),
                serial = %record.serial,
                "ignoring incomplete record"
            );
            return;
        }
        let readings = &record.readings;

        self.input_current_arrays[0].set(readings[INPUT_CURRENT_1]);
        self.input_current_arrays[1].set(readings[INPUT_CURRENT_2]);
        self.input_voltage_arrays[0].set(readings[INPUT_VOLTAGE_1]);
        self.input_voltage_arrays[1].set(readings[INPUT_VOLTAGE_2]);
        self.output_current.set(readings[OUTPUT_CURRENT]);
        self.output_power.set(readings[OUTPUT_POWER]);

        let frequency = readings[GRID_FREQUENCY];
        if frequency > 0.0 {
            if !self.grid_tied.swap(true, Ordering::AcqRel) {
                info!(frequency, "grid frequency detected, publishing grid-tied measurements");
            }
            self.output_voltage.set(readings[OUTPUT_VOLTAGE]);
            self.total_energy.set(readings[TOTAL_ENERGY]);
            self.grid_frequency.set(frequency);
        } else if self.grid_tied.swap(false, Ordering::AcqRel) {
            info!(frequency, "grid frequency lost, hiding grid-tied measurements");
        }
    }

    pub fn is_grid_tied(&self) -> bool {
        self.grid_tied.load(Ordering::Acquire)
    }

    /// Last energy total seen, whether or not it is currently published
    pub fn total_energy(&self) -> f64 {
        self.total_energy.get()
    }

    pub fn snapshot(&self) -> MeasurementSnapshot {
        let grid_tied = self.is_grid_tied();
        let published = |gauge: &Gauge| grid_tied.then(|| gauge.get());
        MeasurementSnapshot {
            input_current: [
                self.input_current_arrays[0].get(),
                self.input_current_arrays[1].get(),
            ],
            input_voltage: [
                self.input_voltage_arrays[0].get(),
                self.input_voltage_arrays[1].get(),
            ],
            output_current: self.output_current.get(),
            output_power: self.output_power.get(),
            output_voltage: published(&self.output_voltage),
            total_energy: published(&self.total_energy),
            grid_frequency: published(&self.grid_frequency),
        }
    }

    fn always_published(&self) -> [&dyn Collector; 4] {
        [
            &self.input_current,
            &self.input_voltage,
            &self.output_current,
            &self.output_power,
        ]
    }

    fn grid_tied_only(&self) -> [&dyn Collector; 3] {
        [&self.output_voltage, &self.total_energy, &self.grid_frequency]
    }
}

impl Collector for MeasurementSet {
    fn desc(&self) -> Vec<&Desc> {
        self.always_published()
            .into_iter()
            .chain(self.grid_tied_only())
            .flat_map(|collector| collector.desc())
            .collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let mut collectors = self.always_published().to_vec();
        if self.is_grid_tied() {
            collectors.extend(self.grid_tied_only());
        }
        collectors
            .into_iter()
            .flat_map(|collector| collector.collect())
            .collect()
    }
}

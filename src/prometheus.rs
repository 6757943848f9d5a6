use crate::constants::METRICS_PREFIX;
use crate::models::ValidatorsResult;
use crate::utils::ErrorHandling;

use log::error;
use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use std::fmt;
use std::sync::atomic::AtomicU64;

type FloatGauge = Gauge<f64, AtomicU64>;

// label set of a family that is declared but carries no samples
type NoLabels = Vec<(String, String)>;

// prometheus metrics label format
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct Labels {
    pub account_id: String,
}

impl Labels {
    pub fn account(account_id: &str) -> Self {
        Self {
            account_id: account_id.to_string(),
        }
    }
}

/// The fixed set of metrics exported on every scrape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MetricDescriptor {
    ActiveValidators,
    EpochStartHeight,
    ValidatorStake,
    ExpectedBlocks,
    ProducedBlocks,
    IsSlashed,
}

impl MetricDescriptor {
    pub const ALL: [MetricDescriptor; 6] = [
        MetricDescriptor::ActiveValidators,
        MetricDescriptor::EpochStartHeight,
        MetricDescriptor::ValidatorStake,
        MetricDescriptor::ExpectedBlocks,
        MetricDescriptor::ProducedBlocks,
        MetricDescriptor::IsSlashed,
    ];

    // name without the registry prefix
    pub fn name(&self) -> &'static str {
        match self {
            MetricDescriptor::ActiveValidators => "active_validators",
            MetricDescriptor::EpochStartHeight => "epoch_start_height",
            MetricDescriptor::ValidatorStake => "validator_stake",
            MetricDescriptor::ExpectedBlocks => "validator_expected_blocks",
            MetricDescriptor::ProducedBlocks => "validator_produced_blocks",
            MetricDescriptor::IsSlashed => "validator_is_slashed",
        }
    }

    pub fn full_name(&self) -> String {
        format!("{}_{}", METRICS_PREFIX, self.name())
    }

    pub fn help(&self) -> &'static str {
        match self {
            MetricDescriptor::ActiveValidators => "Total number of active validators",
            MetricDescriptor::EpochStartHeight => "Current epoch's start height",
            MetricDescriptor::ValidatorStake => "Validator's stake",
            MetricDescriptor::ExpectedBlocks => "Validators's expected blocks",
            MetricDescriptor::ProducedBlocks => "Validator's actual produced blocks",
            MetricDescriptor::IsSlashed => "Whether the validator is slashed",
        }
    }

    pub fn is_labeled(&self) -> bool {
        !matches!(
            self,
            MetricDescriptor::ActiveValidators | MetricDescriptor::EpochStartHeight
        )
    }
}

/// A field of a single validator record that could not be turned into a value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SampleError {
    #[error("invalid stake: {0}")]
    InvalidStake(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetricSample {
    Valid {
        descriptor: MetricDescriptor,
        labels: Option<Labels>,
        value: f64,
    },
    Invalid {
        descriptor: MetricDescriptor,
        labels: Option<Labels>,
        error: String,
    },
}

impl MetricSample {
    pub fn valid(descriptor: MetricDescriptor, labels: Option<Labels>, value: f64) -> Self {
        MetricSample::Valid {
            descriptor,
            labels,
            value,
        }
    }

    pub fn invalid(
        descriptor: MetricDescriptor,
        labels: Option<Labels>,
        error: impl fmt::Display,
    ) -> Self {
        MetricSample::Invalid {
            descriptor,
            labels,
            error: error.to_string(),
        }
    }

    pub fn descriptor(&self) -> MetricDescriptor {
        match self {
            MetricSample::Valid { descriptor, .. } | MetricSample::Invalid { descriptor, .. } => {
                *descriptor
            }
        }
    }

    pub fn labels(&self) -> Option<&Labels> {
        match self {
            MetricSample::Valid { labels, .. } | MetricSample::Invalid { labels, .. } => {
                labels.as_ref()
            }
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            MetricSample::Valid { value, .. } => Some(*value),
            MetricSample::Invalid { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            MetricSample::Valid { .. } => None,
            MetricSample::Invalid { error, .. } => Some(error),
        }
    }
}

impl fmt::Display for MetricSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.descriptor().full_name())?;
        if let Some(labels) = self.labels() {
            write!(f, "{{account_id=\"{}\"}}", labels.account_id)?;
        }
        match self {
            MetricSample::Valid { value, .. } => write!(f, " {value}"),
            MetricSample::Invalid { error, .. } => write!(f, ": {error}"),
        }
    }
}

fn parse_stake(stake: &str) -> Result<f64, SampleError> {
    stake
        .parse::<f64>()
        .map_err(|_| SampleError::InvalidStake(stake.to_string()))
}

// turn a validator set into samples, failures stay local to one sample
pub fn map_to_samples(validators: &ValidatorsResult) -> Vec<MetricSample> {
    let mut samples = Vec::with_capacity(2 + 4 * validators.current_validators.len());

    samples.push(MetricSample::valid(
        MetricDescriptor::ActiveValidators,
        None,
        validators.current_validators.len() as f64,
    ));
    samples.push(MetricSample::valid(
        MetricDescriptor::EpochStartHeight,
        None,
        validators.epoch_start_height as f64,
    ));

    for validator in validators.current_validators.iter() {
        let labels = Labels::account(&validator.account_id);

        samples.push(match parse_stake(&validator.stake) {
            Ok(stake) => {
                MetricSample::valid(MetricDescriptor::ValidatorStake, Some(labels.clone()), stake)
            }
            Err(e) => MetricSample::invalid(MetricDescriptor::ValidatorStake, Some(labels.clone()), e),
        });
        samples.push(MetricSample::valid(
            MetricDescriptor::ExpectedBlocks,
            Some(labels.clone()),
            validator.num_expected_blocks as f64,
        ));
        samples.push(MetricSample::valid(
            MetricDescriptor::ProducedBlocks,
            Some(labels.clone()),
            validator.num_produced_blocks as f64,
        ));
        samples.push(MetricSample::valid(
            MetricDescriptor::IsSlashed,
            Some(labels),
            if validator.is_slashed { 1.0 } else { 0.0 },
        ));
    }

    samples
}

/// One abort cause fanned out to every declared metric.
pub fn invalid_for_all(cause: &impl fmt::Display) -> Vec<MetricSample> {
    MetricDescriptor::ALL
        .iter()
        .map(|descriptor| MetricSample::invalid(*descriptor, None, cause))
        .collect()
}

/// Result of rendering one scrape.
#[derive(Debug, PartialEq)]
pub enum Exposition {
    Metrics(String),
    Failed(String),
}

// per-scrape registry; every descriptor is declared, an unlabeled one without
// a valid value becomes an empty family instead of a zero gauge
fn scrape_registry(samples: &[MetricSample]) -> Registry {
    let mut registry = Registry::with_prefix(METRICS_PREFIX);

    for descriptor in MetricDescriptor::ALL {
        let mut values = samples
            .iter()
            .filter(|sample| sample.descriptor() == descriptor)
            .filter_map(|sample| sample.value().map(|value| (sample.labels(), value)));

        if descriptor.is_labeled() {
            let family = Family::<Labels, FloatGauge>::default();
            for (labels, value) in values {
                if let Some(labels) = labels {
                    family.get_or_create(labels).set(value);
                }
            }
            registry.register(descriptor.name(), descriptor.help(), family);
        } else if let Some((_, value)) = values.next() {
            let gauge = FloatGauge::default();
            gauge.set(value);
            registry.register(descriptor.name(), descriptor.help(), gauge);
        } else {
            let empty = Family::<NoLabels, FloatGauge>::default();
            registry.register(descriptor.name(), descriptor.help(), empty);
        }
    }

    registry
}

// render samples as openmetrics text, invalid samples handled per `handling`
pub fn encode_samples(
    samples: &[MetricSample],
    handling: ErrorHandling,
) -> Result<Exposition, fmt::Error> {
    let invalid: Vec<&MetricSample> = samples
        .iter()
        .filter(|sample| sample.error().is_some())
        .collect();

    for sample in invalid.iter() {
        error!("Invalid sample {sample}");
    }

    if handling == ErrorHandling::HttpError && !invalid.is_empty() {
        let mut message = String::from("An error has occurred while serving metrics:\n\n");
        for sample in invalid {
            message.push_str(&format!("* {sample}\n"));
        }
        return Ok(Exposition::Failed(message));
    }

    let registry = scrape_registry(samples);
    let mut encoded = String::new();
    encode(&mut encoded, &registry)?;
    Ok(Exposition::Metrics(encoded))
}

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Clinical resource types the pipeline moves from OpenMRS to the sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    Patient,
    Encounter,
    Observation,
}

impl ResourceType {
    /// Every resource type a run must count, in reporting order.
    pub const ALL: [ResourceType; 3] = [
        ResourceType::Patient,
        ResourceType::Encounter,
        ResourceType::Observation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Patient => "Patient",
            Self::Encounter => "Encounter",
            Self::Observation => "Observation",
        }
    }

    /// Search parameter that matches the test patient's given name on this type.
    pub fn given_name_param(&self) -> &'static str {
        match self {
            Self::Patient => "given",
            Self::Encounter | Self::Observation => "subject.given",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Patient" => Ok(Self::Patient),
            "Encounter" => Ok(Self::Encounter),
            "Observation" => Ok(Self::Observation),
            other => Err(Error::argument(format!(
                "unsupported resource type `{other}` (expected Patient, Encounter or Observation)"
            ))),
        }
    }
}

/// Where a count was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountSource {
    Openmrs,
    Parquet,
    FhirSink,
}

impl CountSource {
    /// Label used in the pass/fail lines of the report.
    pub fn sink_label(&self) -> &'static str {
        match self {
            Self::Openmrs => "OPENMRS",
            Self::Parquet => "PARQUET SINK",
            Self::FhirSink => "FHIR SINK",
        }
    }
}

impl fmt::Display for CountSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Openmrs => write!(f, "openmrs"),
            Self::Parquet => write!(f, "parquet"),
            Self::FhirSink => write!(f, "fhir_sink"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCount {
    pub resource_type: ResourceType,
    pub source: CountSource,
    pub count: u64,
}

/// All counts taken from one source during a run.
///
/// Holds at most one count per resource type; recording a type twice is
/// rejected so a run can never silently overwrite an observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountSet {
    source: CountSource,
    counts: BTreeMap<ResourceType, u64>,
}

impl CountSet {
    pub fn new(source: CountSource) -> Self {
        Self {
            source,
            counts: BTreeMap::new(),
        }
    }

    pub fn source(&self) -> CountSource {
        self.source
    }

    pub fn record(&mut self, resource_type: ResourceType, count: u64) -> Result<()> {
        if self.counts.contains_key(&resource_type) {
            return Err(Error::argument(format!(
                "{resource_type} was already counted for {}",
                self.source
            )));
        }
        self.counts.insert(resource_type, count);
        Ok(())
    }

    pub fn get(&self, resource_type: ResourceType) -> Option<u64> {
        self.counts.get(&resource_type).copied()
    }

    pub fn missing(&self) -> Vec<ResourceType> {
        ResourceType::ALL
            .into_iter()
            .filter(|rt| !self.counts.contains_key(rt))
            .collect()
    }

    /// Fails unless every resource type has been counted.
    pub fn ensure_complete(&self) -> Result<()> {
        let missing = self.missing();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::IncompleteCounts {
                source_kind: self.source,
                missing,
            })
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = ResourceCount> + '_ {
        self.counts.iter().map(|(rt, count)| ResourceCount {
            resource_type: *rt,
            source: self.source,
            count: *count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_type_round_trip_names() {
        for rt in ResourceType::ALL {
            assert_eq!(rt.as_str().parse::<ResourceType>().unwrap(), rt);
        }
        assert!("Condition".parse::<ResourceType>().is_err());
    }

    #[test]
    fn test_given_name_param() {
        assert_eq!(ResourceType::Patient.given_name_param(), "given");
        assert_eq!(ResourceType::Encounter.given_name_param(), "subject.given");
        assert_eq!(ResourceType::Observation.given_name_param(), "subject.given");
    }

    #[test]
    fn test_count_set_rejects_duplicates() {
        let mut set = CountSet::new(CountSource::Openmrs);
        set.record(ResourceType::Patient, 12).unwrap();
        assert!(set.record(ResourceType::Patient, 13).is_err());
        assert_eq!(set.get(ResourceType::Patient), Some(12));
    }

    #[test]
    fn test_count_set_completeness() {
        let mut set = CountSet::new(CountSource::Parquet);
        set.record(ResourceType::Patient, 1).unwrap();
        assert_eq!(
            set.missing(),
            vec![ResourceType::Encounter, ResourceType::Observation]
        );
        assert!(matches!(
            set.ensure_complete(),
            Err(Error::IncompleteCounts { .. })
        ));

        set.record(ResourceType::Encounter, 2).unwrap();
        set.record(ResourceType::Observation, 3).unwrap();
        assert!(set.ensure_complete().is_ok());
        assert_eq!(set.iter().count(), 3);
    }
}

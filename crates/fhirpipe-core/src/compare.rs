//! Count comparison between the OpenMRS baseline and each sink.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::resource::{CountSet, CountSource, ResourceType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ComparisonResult {
    pub resource_type: ResourceType,
    pub expected: u64,
    pub actual: u64,
    pub matched: bool,
}

impl ComparisonResult {
    fn new(resource_type: ResourceType, expected: u64, actual: u64) -> Self {
        Self {
            resource_type,
            expected,
            actual,
            matched: expected == actual,
        }
    }
}

/// Outcome of checking one sink against the baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SinkComparison {
    pub source: CountSource,
    pub results: Vec<ComparisonResult>,
}

impl SinkComparison {
    pub fn passed(&self) -> bool {
        self.results.iter().all(|r| r.matched)
    }

    pub fn mismatches(&self) -> impl Iterator<Item = &ComparisonResult> {
        self.results.iter().filter(|r| !r.matched)
    }
}

/// Compares every resource type of `candidate` against `baseline`.
///
/// Both sets must be complete; a partially counted sink can never pass.
pub fn compare(baseline: &CountSet, candidate: &CountSet) -> Result<SinkComparison> {
    baseline.ensure_complete()?;
    candidate.ensure_complete()?;

    let mut results = Vec::with_capacity(ResourceType::ALL.len());
    for rt in ResourceType::ALL {
        let expected = count_of(baseline, rt)?;
        let actual = count_of(candidate, rt)?;
        let result = ComparisonResult::new(rt, expected, actual);
        if !result.matched {
            tracing::warn!(
                resource_type = %rt,
                source = %candidate.source(),
                expected,
                actual,
                "Count mismatch"
            );
        }
        results.push(result);
    }

    Ok(SinkComparison {
        source: candidate.source(),
        results,
    })
}

fn count_of(set: &CountSet, resource_type: ResourceType) -> Result<u64> {
    set.get(resource_type).ok_or_else(|| Error::IncompleteCounts {
        source_kind: set.source(),
        missing: set.missing(),
    })
}

/// Overall result of a run across every checked sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub sinks: Vec<SinkComparison>,
}

impl Verdict {
    /// Compares each candidate set against the baseline.
    pub fn evaluate(baseline: &CountSet, candidates: &[CountSet]) -> Result<Self> {
        if candidates.is_empty() {
            return Err(Error::argument("no sink selected for comparison"));
        }
        let sinks = candidates
            .iter()
            .map(|candidate| compare(baseline, candidate))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { sinks })
    }

    /// True iff every resource type matched for every sink.
    pub fn passed(&self) -> bool {
        !self.sinks.is_empty() && self.sinks.iter().all(SinkComparison::passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(source: CountSource, patient: u64, encounter: u64, observation: u64) -> CountSet {
        let mut set = CountSet::new(source);
        set.record(ResourceType::Patient, patient).unwrap();
        set.record(ResourceType::Encounter, encounter).unwrap();
        set.record(ResourceType::Observation, observation).unwrap();
        set
    }

    #[test]
    fn test_all_equal_passes() {
        let baseline = counts(CountSource::Openmrs, 12, 40, 103);
        let parquet = counts(CountSource::Parquet, 12, 40, 103);
        let sink = counts(CountSource::FhirSink, 12, 40, 103);
        let verdict = Verdict::evaluate(&baseline, &[parquet, sink]).unwrap();
        assert!(verdict.passed());
        assert_eq!(verdict.sinks.len(), 2);
    }

    #[test]
    fn test_single_mismatch_is_named() {
        let baseline = counts(CountSource::Openmrs, 12, 40, 103);
        let parquet = counts(CountSource::Parquet, 12, 40, 103);
        let sink = counts(CountSource::FhirSink, 12, 39, 103);
        let verdict = Verdict::evaluate(&baseline, &[parquet, sink]).unwrap();
        assert!(!verdict.passed());

        assert!(verdict.sinks[0].passed());
        let fhir = &verdict.sinks[1];
        assert_eq!(fhir.source, CountSource::FhirSink);
        let mismatches: Vec<_> = fhir.mismatches().collect();
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].resource_type, ResourceType::Encounter);
        assert_eq!(mismatches[0].expected, 40);
        assert_eq!(mismatches[0].actual, 39);
    }

    #[test]
    fn test_incomplete_candidate_is_rejected() {
        let baseline = counts(CountSource::Openmrs, 1, 1, 1);
        let mut partial = CountSet::new(CountSource::Parquet);
        partial.record(ResourceType::Patient, 1).unwrap();
        let err = compare(&baseline, &partial).unwrap_err();
        assert!(matches!(
            err,
            Error::IncompleteCounts {
                source_kind: CountSource::Parquet,
                ..
            }
        ));
    }

    #[test]
    fn test_no_candidates_is_an_error() {
        let baseline = counts(CountSource::Openmrs, 1, 1, 1);
        assert!(Verdict::evaluate(&baseline, &[]).is_err());
    }

    #[test]
    fn test_zero_counts_match() {
        let baseline = counts(CountSource::Openmrs, 0, 0, 0);
        let sink = counts(CountSource::FhirSink, 0, 0, 0);
        assert!(Verdict::evaluate(&baseline, &[sink]).unwrap().passed());
    }
}

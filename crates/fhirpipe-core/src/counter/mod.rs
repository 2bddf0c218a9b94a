//! Resource counters for the source and each sink.
//!
//! Every counter answers one question: how many resources of a given type does
//! its system hold right now. Counters never retry; a failed count is returned
//! to the caller as-is.

mod fhir_sink;
#[cfg(feature = "native-rowcount")]
mod native;
mod openmrs;
mod parquet;

use async_trait::async_trait;

pub use fhir_sink::FhirSinkCounter;
#[cfg(feature = "native-rowcount")]
pub use native::count_parquet_rows;
pub use openmrs::OpenmrsCounter;
pub use parquet::{ParquetCounter, RowCountBackend, RowCountTool};

use crate::error::Result;
use crate::resource::{CountSet, CountSource, ResourceType};

#[async_trait]
pub trait ResourceCounter: Send + Sync {
    fn source(&self) -> CountSource;

    async fn count(&self, resource_type: ResourceType) -> Result<u64>;
}

/// Counts every resource type in order, stopping at the first failure.
pub async fn collect_counts(counter: &dyn ResourceCounter) -> Result<CountSet> {
    let mut set = CountSet::new(counter.source());
    for rt in ResourceType::ALL {
        let count = counter.count(rt).await?;
        tracing::info!(
            resource_type = %rt,
            source = %counter.source(),
            count,
            "Counted resources"
        );
        set.record(rt, count)?;
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::error::Error;

    struct Scripted {
        calls: Mutex<Vec<ResourceType>>,
        fail_on: Option<ResourceType>,
    }

    #[async_trait]
    impl ResourceCounter for Scripted {
        fn source(&self) -> CountSource {
            CountSource::Parquet
        }

        async fn count(&self, resource_type: ResourceType) -> Result<u64> {
            self.calls.lock().unwrap().push(resource_type);
            if self.fail_on == Some(resource_type) {
                return Err(Error::tool("rowcount", "boom"));
            }
            Ok(resource_type as u64 + 1)
        }
    }

    #[tokio::test]
    async fn test_collect_counts_in_order() {
        let counter = Scripted {
            calls: Mutex::new(Vec::new()),
            fail_on: None,
        };
        let set = collect_counts(&counter).await.unwrap();
        assert_eq!(*counter.calls.lock().unwrap(), ResourceType::ALL.to_vec());
        assert_eq!(set.source(), CountSource::Parquet);
        assert!(set.ensure_complete().is_ok());
    }

    #[tokio::test]
    async fn test_collect_counts_stops_at_first_failure() {
        let counter = Scripted {
            calls: Mutex::new(Vec::new()),
            fail_on: Some(ResourceType::Encounter),
        };
        assert!(collect_counts(&counter).await.is_err());
        assert_eq!(
            *counter.calls.lock().unwrap(),
            vec![ResourceType::Patient, ResourceType::Encounter]
        );
    }
}

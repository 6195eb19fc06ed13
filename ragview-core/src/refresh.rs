use crate::errors::ClientResult;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RefreshStatus {
    #[default]
    Idle,
    Pending,
    Succeeded,
    Failed(String),
}

/// Tells the graph widget that a reprocessing attempt concluded.
///
/// `revision` changes once per concluded attempt whatever its outcome, so the
/// widget can detect "something happened" by comparing against the revision it
/// last loaded. `status` reflects only the most recent request.
#[derive(Debug, Default)]
pub struct GraphRefresh {
    revision: u64,
    latest_request: u64,
    in_flight: usize,
    status: RefreshStatus,
}

impl GraphRefresh {
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn status(&self) -> &RefreshStatus {
        &self.status
    }

    pub fn is_syncing(&self) -> bool {
        self.in_flight > 0
    }

    pub fn begin(&mut self) -> u64 {
        self.latest_request += 1;
        self.in_flight += 1;
        self.status = RefreshStatus::Pending;
        self.latest_request
    }

    pub fn finish(&mut self, request: u64, result: &ClientResult<()>) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.revision += 1;
        if let Err(err) = result {
            tracing::error!("Graph reprocessing request {request} failed: {err}");
        }
        if request != self.latest_request {
            return;
        }
        self.status = match result {
            Ok(()) => RefreshStatus::Succeeded,
            Err(err) => RefreshStatus::Failed(err.to_string()),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn revision_moves_once_per_attempt_regardless_of_outcome() {
        let mut refresh = GraphRefresh::default();
        let request = refresh.begin();
        assert!(refresh.is_syncing());
        assert_eq!(refresh.status(), &RefreshStatus::Pending);
        refresh.finish(
            request,
            &Err(ErrorKind::Status {
                status: 500,
                body: "graph build failed".to_string(),
            }
            .into()),
        );
        assert_eq!(refresh.revision(), 1);
        assert!(!refresh.is_syncing());
        assert!(matches!(refresh.status(), RefreshStatus::Failed(msg) if msg.contains("graph build failed")));

        let request = refresh.begin();
        refresh.finish(request, &Ok(()));
        assert_eq!(refresh.revision(), 2);
        assert_eq!(refresh.status(), &RefreshStatus::Succeeded);
    }

    #[test]
    fn older_request_cannot_overwrite_newer_status() {
        let mut refresh = GraphRefresh::default();
        let first = refresh.begin();
        let second = refresh.begin();

        refresh.finish(second, &Ok(()));
        assert!(refresh.is_syncing());
        refresh.finish(
            first,
            &Err(ErrorKind::Status {
                status: 500,
                body: "stale".to_string(),
            }
            .into()),
        );

        assert_eq!(refresh.revision(), 2);
        assert_eq!(refresh.status(), &RefreshStatus::Succeeded);
        assert!(!refresh.is_syncing());
    }
}

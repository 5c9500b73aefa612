use std::sync::Arc;

use crate::config::SearchConfig;
use crate::workflows::repository::{EstateRepository, RepositoryError};

use super::domain::{PremisesId, PremisesSummary, ServiceName};

/// Read access to the estate for listing endpoints.
pub struct EstateService<R> {
    repository: Arc<R>,
    config: SearchConfig,
}

impl<R> EstateService<R>
where
    R: EstateRepository + 'static,
{
    pub fn new(repository: Arc<R>, config: SearchConfig) -> Self {
        Self { repository, config }
    }

    pub fn default_page_size(&self) -> u32 {
        self.config.default_page_size
    }

    /// Premises ordered by name, optionally restricted to one service.
    pub fn list_premises(
        &self,
        service: Option<ServiceName>,
    ) -> Result<Vec<PremisesSummary>, RepositoryError> {
        let services = match service {
            Some(service) => vec![service],
            None => vec![
                ServiceName::ApprovedPremises,
                ServiceName::TemporaryAccommodation,
            ],
        };

        let mut summaries = Vec::new();
        for service in services {
            summaries.extend(
                self.repository
                    .inventory(service)?
                    .iter()
                    .map(PremisesSummary::from),
            );
        }
        summaries.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(summaries)
    }

    pub fn premises(&self, id: &PremisesId) -> Result<PremisesSummary, RepositoryError> {
        self.repository
            .premises(id)?
            .as_ref()
            .map(PremisesSummary::from)
            .ok_or(RepositoryError::NotFound)
    }
}

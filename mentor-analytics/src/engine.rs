//! Composition root.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::behavior::BehaviorMonitor;
use crate::competency::CompetencyModel;
use crate::config::AnalyticsConfig;
use crate::context::ContextAggregator;
use crate::error::Result;
use crate::performance::PerformanceAnalyzer;
use crate::store::{LearnerStore, open_store};
use crate::types::{CompetencyRecord, PerformanceEvent, TaskOutcome, UserId};

/// The analytics engine: four components sharing one store.
pub struct LearnerAnalytics {
    config: AnalyticsConfig,
    store: Arc<dyn LearnerStore>,
    competency: Arc<CompetencyModel>,
    performance: Arc<PerformanceAnalyzer>,
    behavior: Arc<BehaviorMonitor>,
    context: ContextAggregator,
}

impl LearnerAnalytics {
    /// Validate the config and open the configured store.
    pub async fn open(config: AnalyticsConfig) -> Result<Self> {
        config.validate()?;
        let store = open_store(&config.storage).await?;
        info!(backend = ?config.storage.backend, "learner analytics ready");
        Ok(Self::with_store(config, store))
    }

    /// Wire the components around an existing store.
    pub fn with_store(config: AnalyticsConfig, store: Arc<dyn LearnerStore>) -> Self {
        let competency = Arc::new(CompetencyModel::new(
            Arc::clone(&store),
            config.competency.clone(),
        ));
        let performance = Arc::new(PerformanceAnalyzer::new(
            Arc::clone(&store),
            config.performance.clone(),
        ));
        let behavior = Arc::new(BehaviorMonitor::new(
            Arc::clone(&store),
            config.behavior.clone(),
        ));
        let context = ContextAggregator::new(
            Arc::clone(&competency),
            Arc::clone(&performance),
            Arc::clone(&behavior),
        );

        Self {
            config,
            store,
            competency,
            performance,
            behavior,
            context,
        }
    }

    /// Install the global tracing subscriber from the `[logging]` section.
    pub fn init_tracing(&self) -> Result<()> {
        mentor_observe::init_tracing(&self.config.logging)?;
        Ok(())
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn LearnerStore> {
        &self.store
    }

    pub fn competency(&self) -> &CompetencyModel {
        &self.competency
    }

    pub fn performance(&self) -> &PerformanceAnalyzer {
        &self.performance
    }

    pub fn behavior(&self) -> &BehaviorMonitor {
        &self.behavior
    }

    pub fn context(&self) -> &ContextAggregator {
        &self.context
    }

    /// Log a finished task and fold it into the topic competency.
    ///
    /// The event is logged first and the competency is only updated once the
    /// log write succeeded. A failed competency update leaves the event logged
    /// without a matching competency change; the error is returned.
    #[instrument(skip(self, outcome), fields(mentor.user_id = %user_id, mentor.topic = topic))]
    pub async fn record_task(
        &self,
        user_id: &UserId,
        topic: &str,
        outcome: &TaskOutcome,
    ) -> Result<CompetencyRecord> {
        let event = PerformanceEvent::from_outcome(topic, outcome);
        self.performance.log_task(user_id, &event).await?;
        self.competency.update_after_task(user_id, topic, outcome).await
    }
}

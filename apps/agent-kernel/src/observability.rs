use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rolling analytics for one agent, fed by its event log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentMetrics {
    pub consultations: usize,
    pub total_consultation_secs: f64,
    pub consultation_types: BTreeMap<String, usize>,
    pub complexity_levels: BTreeMap<String, usize>,
    pub deliverables: BTreeMap<String, usize>,
    pub satisfaction_ratings: usize,
    pub satisfaction_total: f64,
    pub total_errors: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricsSummary {
    pub consultations: usize,
    pub avg_consultation_secs: f64,
    pub avg_satisfaction: Option<f64>,
    pub most_requested_consultation: Option<String>,
    pub total_errors: usize,
}

impl AgentMetrics {
    pub fn track_consultation(
        &mut self,
        consultation_type: &str,
        complexity: &str,
        deliverable_type: &str,
        duration_secs: f64,
    ) {
        self.consultations += 1;
        self.total_consultation_secs += duration_secs.max(0.0);
        *self.consultation_types.entry(consultation_type.to_string()).or_insert(0) += 1;
        *self.complexity_levels.entry(complexity.to_string()).or_insert(0) += 1;
        *self.deliverables.entry(deliverable_type.to_string()).or_insert(0) += 1;
    }

    pub fn track_satisfaction(&mut self, rating: f64) {
        self.satisfaction_ratings += 1;
        self.satisfaction_total += rating;
    }

    pub fn track_error(&mut self) {
        self.total_errors += 1;
    }

    pub fn summary(&self) -> MetricsSummary {
        let avg_consultation_secs = if self.consultations > 0 {
            self.total_consultation_secs / self.consultations as f64
        } else {
            0.0
        };

        // Ties resolve to the alphabetically first type.
        let most_requested_consultation = self
            .consultation_types
            .iter()
            .fold(None::<(&String, usize)>, |best, (name, count)| match best {
                Some((_, best_count)) if best_count >= *count => best,
                _ => Some((name, *count)),
            })
            .map(|(name, _)| name.clone());

        MetricsSummary {
            consultations: self.consultations,
            avg_consultation_secs,
            avg_satisfaction: (self.satisfaction_ratings > 0)
                .then(|| self.satisfaction_total / self.satisfaction_ratings as f64),
            most_requested_consultation,
            total_errors: self.total_errors,
        }
    }
}

//! Selection controller - maps a chosen user to highlights and connectors
//!
//! Two states: `Idle` and `Selected(user_id)`. Every selection starts from
//! `reset()`, so highlights never stack.

use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use crate::dataset::Dataset;
use crate::recommend::{Recommendation, RecommendationTable};
use crate::scene::{ConnectorKind, Highlight, Scene};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "user", rename_all = "snake_case")]
pub enum Selection {
    #[default]
    Idle,
    Selected(String),
}

impl Selection {
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Selection::Idle => None,
            Selection::Selected(id) => Some(id),
        }
    }
}

/// Owns the scene plus the lookup tables that drive highlighting
pub struct SelectionController {
    scene: Scene,
    ratings: HashMap<String, Vec<usize>>,
    recommendations: RecommendationTable,
    selection: Selection,
}

impl SelectionController {
    pub fn new(dataset: &Dataset, recommendations: RecommendationTable) -> Self {
        let ratings = dataset
            .ratings
            .keys()
            .map(|id| (id.clone(), dataset.watched(id)))
            .collect();

        Self {
            scene: Scene::from_dataset(dataset),
            ratings,
            recommendations,
            selection: Selection::Idle,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn watched(&self, user_id: &str) -> &[usize] {
        self.ratings.get(user_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn recommendations(&self, user_id: &str) -> Option<&[Recommendation]> {
        self.recommendations.get(user_id)
    }

    /// Drop every connector and restore default highlights
    pub fn reset(&mut self) {
        self.scene.clear_connectors();
        self.scene.clear_highlights();
        self.selection = Selection::Idle;
    }

    /// Apply a selection; empty or unknown ids leave the scene idle
    pub fn select_user(&mut self, user_id: Option<&str>) {
        self.reset();

        let Some(id) = user_id.filter(|id| !id.is_empty()) else {
            return;
        };

        let Some(slot) = self.scene.find_user(id) else {
            debug!("Ignoring selection of unknown user '{}'", id);
            return;
        };

        self.scene.set_user_highlight(slot, Highlight::Selected);

        if let Some(watched) = self.ratings.get(id) {
            for &show in watched {
                self.scene.connect(slot, show, ConnectorKind::Watched);
            }
        }

        if let Some(recs) = self.recommendations.get(id) {
            for rec in recs {
                self.scene.connect(slot, rec.index, ConnectorKind::Recommended);
            }
            for rec in recs {
                self.scene.set_show_highlight(rec.index, Highlight::Recommended);
            }
        }

        debug!(
            "Selected '{}': {} watched, {} recommended connectors",
            id,
            self.scene.connectors_of(ConnectorKind::Watched).count(),
            self.scene.connectors_of(ConnectorKind::Recommended).count()
        );
        self.selection = Selection::Selected(id.to_string());
    }

    /// Teardown back to idle
    pub fn clear(&mut self) {
        self.reset();
    }
}

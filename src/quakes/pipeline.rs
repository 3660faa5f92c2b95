use std::fmt;

use bevy::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedKind {
    Earthquakes,
    Plates,
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedKind::Earthquakes => write!(f, "earthquakes"),
            FeedKind::Plates => write!(f, "tectonic plates"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum FeedStage {
    #[default]
    Idle,
    LoadingQuakes,
    /// Quakes have arrived but their markers are not spawned yet.
    QuakesReady,
    LoadingPlates,
    Ready,
    Failed {
        kind: FeedKind,
        message: String,
    },
}

/// Two-stage feed sequencing. Plates are only requested after the earthquake
/// markers have been rendered.
#[derive(Resource, Debug, Clone, Default)]
pub struct FeedPipeline {
    stage: FeedStage,
    /// Bumped on every (re)start so late results from an older run are ignored.
    generation: u64,
}

impl FeedPipeline {
    pub fn stage(&self) -> &FeedStage {
        &self.stage
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_loading(&self) -> bool {
        matches!(
            self.stage,
            FeedStage::LoadingQuakes | FeedStage::QuakesReady | FeedStage::LoadingPlates
        )
    }

    /// Starts a new run. Returns the first request to issue.
    pub fn start(&mut self) -> (u64, FeedKind) {
        self.generation += 1;
        self.stage = FeedStage::LoadingQuakes;
        (self.generation, FeedKind::Earthquakes)
    }

    /// Accepts a result for `kind`. Returns false when it belongs to an older run
    /// or arrives out of order.
    pub fn on_loaded(&mut self, generation: u64, kind: FeedKind) -> bool {
        if generation != self.generation {
            return false;
        }
        match (&self.stage, kind) {
            (FeedStage::LoadingQuakes, FeedKind::Earthquakes) => {
                self.stage = FeedStage::QuakesReady;
                true
            }
            (FeedStage::LoadingPlates, FeedKind::Plates) => {
                self.stage = FeedStage::Ready;
                true
            }
            _ => false,
        }
    }

    /// Called once the earthquake markers are spawned. Returns the plate request if it is due.
    pub fn on_quakes_rendered(&mut self) -> Option<(u64, FeedKind)> {
        if self.stage == FeedStage::QuakesReady {
            self.stage = FeedStage::LoadingPlates;
            Some((self.generation, FeedKind::Plates))
        } else {
            None
        }
    }

    pub fn on_failed(&mut self, generation: u64, kind: FeedKind, message: String) -> bool {
        if generation != self.generation || !self.is_loading() {
            return false;
        }
        self.stage = FeedStage::Failed { kind, message };
        true
    }

    pub fn status_text(&self) -> String {
        match &self.stage {
            FeedStage::Idle => "Waiting".to_string(),
            FeedStage::LoadingQuakes => "Loading earthquakes…".to_string(),
            FeedStage::QuakesReady => "Drawing earthquakes…".to_string(),
            FeedStage::LoadingPlates => "Loading tectonic plates…".to_string(),
            FeedStage::Ready => "Up to date".to_string(),
            FeedStage::Failed { kind, message } => format!("Failed to load {}: {}", kind, message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plates_wait_for_rendered_quakes() {
        let mut pipeline = FeedPipeline::default();
        let (generation, kind) = pipeline.start();
        assert_eq!(kind, FeedKind::Earthquakes);
        assert_eq!(pipeline.on_quakes_rendered(), None);

        assert!(pipeline.on_loaded(generation, FeedKind::Earthquakes));
        assert_eq!(pipeline.stage(), &FeedStage::QuakesReady);

        assert_eq!(
            pipeline.on_quakes_rendered(),
            Some((generation, FeedKind::Plates))
        );
        assert_eq!(pipeline.on_quakes_rendered(), None);

        assert!(pipeline.on_loaded(generation, FeedKind::Plates));
        assert_eq!(pipeline.stage(), &FeedStage::Ready);
        assert!(!pipeline.is_loading());
    }

    #[test]
    fn plates_out_of_order_are_ignored() {
        let mut pipeline = FeedPipeline::default();
        let (generation, _) = pipeline.start();
        assert!(!pipeline.on_loaded(generation, FeedKind::Plates));
        assert_eq!(pipeline.stage(), &FeedStage::LoadingQuakes);
    }

    #[test]
    fn restart_discards_old_results() {
        let mut pipeline = FeedPipeline::default();
        let (old, _) = pipeline.start();
        let (new, _) = pipeline.start();
        assert_ne!(old, new);
        assert!(!pipeline.on_loaded(old, FeedKind::Earthquakes));
        assert!(!pipeline.on_failed(old, FeedKind::Earthquakes, "timeout".into()));
        assert!(pipeline.on_loaded(new, FeedKind::Earthquakes));
    }

    #[test]
    fn failure_stops_the_chain() {
        let mut pipeline = FeedPipeline::default();
        let (generation, _) = pipeline.start();
        assert!(pipeline.on_failed(generation, FeedKind::Earthquakes, "status 503".into()));
        assert_eq!(pipeline.on_quakes_rendered(), None);
        assert!(!pipeline.is_loading());
        assert_eq!(
            pipeline.status_text(),
            "Failed to load earthquakes: status 503"
        );
    }
}

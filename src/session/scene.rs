//! Presentation state accumulated from director panels

use crate::director::types::Utterance;

/// Director note, scene log and loading flag
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneState {
    director_note: Option<String>,
    scene_log: Vec<Utterance>,
    loading: bool,
}

impl SceneState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest director message, if any arrived
    pub fn director_note(&self) -> Option<&str> {
        self.director_note.as_deref()
    }

    pub fn scene_log(&self) -> &[Utterance] {
        &self.scene_log
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Replace the director note; never concatenates
    pub fn set_director_note(&mut self, message: impl Into<String>) {
        self.director_note = Some(message.into());
    }

    /// Append utterances in arrival order
    pub fn append_utterances(&mut self, utterances: &[Utterance]) {
        self.scene_log.extend_from_slice(utterances);
    }

    /// Returns whether the flag changed
    pub fn set_loading(&mut self, loading: bool) -> bool {
        let changed = self.loading != loading;
        self.loading = loading;
        changed
    }

    /// Drop the director note and the scene log
    pub fn clear(&mut self) {
        self.director_note = None;
        self.scene_log.clear();
    }

    /// Drop the scene log only
    pub fn clear_scene_log(&mut self) {
        self.scene_log.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_director_note_is_replaced() {
        let mut scene = SceneState::new();
        assert_eq!(scene.director_note(), None);

        scene.set_director_note("first");
        scene.set_director_note("second");
        assert_eq!(scene.director_note(), Some("second"));
    }

    #[test]
    fn test_append_keeps_order() {
        let mut scene = SceneState::new();
        scene.append_utterances(&[Utterance::new("A", "1", None)]);
        scene.append_utterances(&[Utterance::new("B", "2", None), Utterance::new("C", "3", None)]);

        let speakers: Vec<&str> = scene.scene_log().iter().map(|u| u.speaker.as_str()).collect();
        assert_eq!(speakers, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_set_loading_reports_change() {
        let mut scene = SceneState::new();
        assert!(scene.set_loading(true));
        assert!(!scene.set_loading(true));
        assert!(scene.set_loading(false));
    }

    #[test]
    fn test_clear() {
        let mut scene = SceneState::new();
        scene.set_director_note("note");
        scene.append_utterances(&[Utterance::new("A", "1", None)]);

        scene.clear_scene_log();
        assert!(scene.scene_log().is_empty());
        assert_eq!(scene.director_note(), Some("note"));

        scene.clear();
        assert_eq!(scene.director_note(), None);
    }
}

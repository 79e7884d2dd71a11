//! Scene model - markers, connectors and their appearance
//!
//! Every marker carries an explicit highlight tag. Appearance is derived
//! from the tag through a [`Palette`] at render time, so no two markers ever
//! share mutable appearance state.

use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;

/// Per-marker visual state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Highlight {
    #[default]
    Default,
    Selected,
    Recommended,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShowMarker {
    pub index: usize,
    pub name: String,
    pub position: [f32; 3],
    pub highlight: Highlight,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserMarker {
    pub id: String,
    pub name: String,
    pub position: [f32; 3],
    pub highlight: Highlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorKind {
    Watched,
    Recommended,
}

/// A line from a user marker to a show marker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Connector {
    pub kind: ConnectorKind,
    pub show_index: usize,
    pub from: [f32; 3],
    pub to: [f32; 3],
}

/// All scene objects, built once from the dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Scene {
    shows: Vec<ShowMarker>,
    users: Vec<UserMarker>,
    connectors: Vec<Connector>,
}

impl Scene {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let shows = dataset
            .shows
            .iter()
            .enumerate()
            .map(|(index, show)| ShowMarker {
                index,
                name: show.name.clone(),
                position: show.position(),
                highlight: Highlight::Default,
            })
            .collect();

        let users = dataset
            .users
            .iter()
            .map(|user| UserMarker {
                id: user.id.clone(),
                name: user.name.clone(),
                position: user.position(),
                highlight: Highlight::Default,
            })
            .collect();

        Self {
            shows,
            users,
            connectors: Vec::new(),
        }
    }

    pub fn shows(&self) -> &[ShowMarker] {
        &self.shows
    }

    pub fn users(&self) -> &[UserMarker] {
        &self.users
    }

    pub fn connectors(&self) -> &[Connector] {
        &self.connectors
    }

    pub fn show(&self, index: usize) -> Option<&ShowMarker> {
        self.shows.get(index)
    }

    pub fn user(&self, slot: usize) -> Option<&UserMarker> {
        self.users.get(slot)
    }

    /// Slot of the user marker with this id
    pub fn find_user(&self, id: &str) -> Option<usize> {
        self.users.iter().position(|u| u.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.shows.is_empty() && self.users.is_empty()
    }

    /// True when nothing is highlighted and no connector exists
    pub fn is_idle(&self) -> bool {
        self.connectors.is_empty()
            && self.shows.iter().all(|s| s.highlight == Highlight::Default)
            && self.users.iter().all(|u| u.highlight == Highlight::Default)
    }

    pub fn connectors_of(&self, kind: ConnectorKind) -> impl Iterator<Item = &Connector> {
        self.connectors.iter().filter(move |c| c.kind == kind)
    }

    /// Bounding box of every marker, `None` for an empty scene
    pub fn bounds(&self) -> Option<([f32; 3], [f32; 3])> {
        let positions = self
            .shows
            .iter()
            .map(|s| s.position)
            .chain(self.users.iter().map(|u| u.position));

        let mut any = false;
        let mut min = [f32::INFINITY; 3];
        let mut max = [f32::NEG_INFINITY; 3];
        for p in positions {
            any = true;
            for i in 0..3 {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
        }
        any.then_some((min, max))
    }

    pub(crate) fn clear_connectors(&mut self) {
        self.connectors.clear();
    }

    pub(crate) fn clear_highlights(&mut self) {
        for show in &mut self.shows {
            show.highlight = Highlight::Default;
        }
        for user in &mut self.users {
            user.highlight = Highlight::Default;
        }
    }

    pub(crate) fn set_user_highlight(&mut self, slot: usize, highlight: Highlight) {
        if let Some(user) = self.users.get_mut(slot) {
            user.highlight = highlight;
        }
    }

    pub(crate) fn set_show_highlight(&mut self, index: usize, highlight: Highlight) -> bool {
        match self.shows.get_mut(index) {
            Some(show) => {
                show.highlight = highlight;
                true
            }
            None => false,
        }
    }

    /// Connect a user to a show; skipped when the show does not exist
    pub(crate) fn connect(&mut self, user_slot: usize, show_index: usize, kind: ConnectorKind) -> bool {
        let (Some(user), Some(show)) = (self.users.get(user_slot), self.shows.get(show_index)) else {
            return false;
        };
        self.connectors.push(Connector {
            kind,
            show_index,
            from: user.position,
            to: show.position,
        });
        true
    }
}

/// RGB color as 0-255 channels
pub type Rgb = [u8; 3];

/// Surface appearance of a marker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Appearance {
    pub color: Rgb,
    #[serde(default)]
    pub emissive: Option<Rgb>,
}

impl Appearance {
    /// Displayed color: emissive tint brightens the base color
    pub fn display_color(&self) -> Rgb {
        match self.emissive {
            Some(e) => [
                self.color[0].saturating_add(e[0] / 2),
                self.color[1].saturating_add(e[1] / 2),
                self.color[2].saturating_add(e[2] / 2),
            ],
            None => self.color,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineStyle {
    pub color: Rgb,
    pub opacity: f32,
    pub width: f32,
}

/// Maps highlight tags and connector kinds to appearance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub show: Appearance,
    pub show_recommended: Appearance,
    pub user: Appearance,
    pub user_selected: Appearance,
    pub watched_line: LineStyle,
    pub recommended_line: LineStyle,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            show: Appearance { color: [0x00, 0xaa, 0xff], emissive: None },
            show_recommended: Appearance { color: [0x00, 0xff, 0x00], emissive: Some([0x33, 0xff, 0x33]) },
            user: Appearance { color: [0xff, 0x44, 0x00], emissive: None },
            user_selected: Appearance { color: [0xff, 0xff, 0xff], emissive: Some([0xee, 0xee, 0xee]) },
            watched_line: LineStyle { color: [0xff, 0xff, 0x00], opacity: 0.6, width: 1.0 },
            recommended_line: LineStyle { color: [0xff, 0x00, 0xff], opacity: 0.9, width: 2.0 },
        }
    }
}

impl Palette {
    pub fn show(&self, highlight: Highlight) -> Appearance {
        match highlight {
            Highlight::Recommended => self.show_recommended,
            // Shows are never selected; fall back to default
            Highlight::Default | Highlight::Selected => self.show,
        }
    }

    pub fn user(&self, highlight: Highlight) -> Appearance {
        match highlight {
            Highlight::Selected => self.user_selected,
            Highlight::Default | Highlight::Recommended => self.user,
        }
    }

    pub fn line(&self, kind: ConnectorKind) -> LineStyle {
        match kind {
            ConnectorKind::Watched => self.watched_line,
            ConnectorKind::Recommended => self.recommended_line,
        }
    }
}

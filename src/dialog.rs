use crate::backend::{ContainerRemoval, ImageRemoval};
use crate::input::Action;
use crate::model::{ResourceKind, short_id};

const CONFIRM_OPTIONS: &[&str] = &["No", "Yes"];

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DialogKind {
    RemoveContainer,
    PruneContainers,
    PruneImages,
    PruneVolumes,
    RemoveVolume,
    RemoveImage,
    Error,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FieldKey {
    Force,
    RemoveVolumes,
    RemoveLinks,
    PruneChildren,
    Confirm,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum FieldValue {
    Toggle(bool),
    Choice {
        options: &'static [&'static str],
        selected: usize,
    },
}

impl FieldValue {
    pub fn display(&self) -> String {
        match self {
            Self::Toggle(true) => "[x]".to_string(),
            Self::Toggle(false) => "[ ]".to_string(),
            Self::Choice { options, selected } => options
                .iter()
                .enumerate()
                .map(|(index, option)| {
                    if index == *selected {
                        format!("<{option}>")
                    } else {
                        format!(" {option} ")
                    }
                })
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    fn step(&mut self, delta: isize) {
        match self {
            Self::Toggle(value) => *value = !*value,
            Self::Choice { options, selected } => {
                let len = options.len() as isize;
                if len > 0 {
                    *selected = (*selected as isize + delta).rem_euclid(len) as usize;
                }
            }
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DialogField {
    pub key: FieldKey,
    pub label: &'static str,
    pub value: FieldValue,
}

impl DialogField {
    fn toggle(key: FieldKey, label: &'static str) -> Self {
        Self {
            key,
            label,
            value: FieldValue::Toggle(false),
        }
    }

    fn confirm() -> Self {
        Self {
            key: FieldKey::Confirm,
            label: "Are you sure?",
            value: FieldValue::Choice {
                options: CONFIRM_OPTIONS,
                selected: 0,
            },
        }
    }
}

/// What a confirmed dialog asks the navigator to do.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum DialogSelection {
    RemoveContainer { id: String, opts: ContainerRemoval },
    RemoveImage { id: String, opts: ImageRemoval },
    RemoveVolume { id: String, force: bool },
    Prune { kind: ResourceKind, confirmed: bool },
    Acknowledged,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum DialogOutcome {
    Pending,
    Confirmed(DialogSelection),
    Cancelled,
}

/// Modal form. While one is open it receives every action.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Dialog {
    kind: DialogKind,
    title: String,
    message: String,
    target: Option<String>,
    fields: Vec<DialogField>,
    focus: usize,
}

impl Dialog {
    pub fn remove_container(id: impl Into<String>) -> Self {
        let id = id.into();
        Self::with_fields(
            DialogKind::RemoveContainer,
            "Remove container",
            format!("Remove container {}?", short_id(&id)),
            Some(id),
            vec![
                DialogField::toggle(FieldKey::RemoveVolumes, "Remove volumes"),
                DialogField::toggle(FieldKey::RemoveLinks, "Remove links"),
                DialogField::toggle(FieldKey::Force, "Force"),
            ],
        )
    }

    pub fn remove_image(id: impl Into<String>) -> Self {
        let id = id.into();
        Self::with_fields(
            DialogKind::RemoveImage,
            "Remove image",
            format!("Remove image {}?", short_id(&id)),
            Some(id),
            vec![
                DialogField::toggle(FieldKey::Force, "Force"),
                DialogField::toggle(FieldKey::PruneChildren, "Prune untagged parents"),
            ],
        )
    }

    pub fn remove_volume(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::with_fields(
            DialogKind::RemoveVolume,
            "Remove volume",
            format!("Remove volume {name}?"),
            Some(name),
            vec![DialogField::toggle(FieldKey::Force, "Force")],
        )
    }

    pub fn prune(kind: ResourceKind) -> Self {
        let (dialog_kind, message) = match kind {
            ResourceKind::Images => (DialogKind::PruneImages, "Remove all dangling images?"),
            ResourceKind::Containers => {
                (DialogKind::PruneContainers, "Remove all stopped containers?")
            }
            ResourceKind::Volumes => (DialogKind::PruneVolumes, "Remove all unused volumes?"),
        };
        Self::with_fields(
            dialog_kind,
            format!("Prune {}", kind.title().to_ascii_lowercase()),
            message.to_string(),
            None,
            vec![DialogField::confirm()],
        )
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_fields(DialogKind::Error, "Error", message.into(), None, Vec::new())
    }

    fn with_fields(
        kind: DialogKind,
        title: impl Into<String>,
        message: String,
        target: Option<String>,
        fields: Vec<DialogField>,
    ) -> Self {
        Self {
            kind,
            title: title.into(),
            message,
            target,
            fields,
            focus: 0,
        }
    }

    pub fn kind(&self) -> DialogKind {
        self.kind
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn fields(&self) -> &[DialogField] {
        &self.fields
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn handle(&mut self, action: &Action) -> DialogOutcome {
        match action {
            Action::Confirm => DialogOutcome::Confirmed(self.selection()),
            Action::Back => DialogOutcome::Cancelled,
            Action::Down => {
                self.move_focus(1);
                DialogOutcome::Pending
            }
            Action::Up => {
                self.move_focus(-1);
                DialogOutcome::Pending
            }
            Action::Right | Action::Toggle => {
                self.step_focused(1);
                DialogOutcome::Pending
            }
            Action::Left => {
                self.step_focused(-1);
                DialogOutcome::Pending
            }
            _ => DialogOutcome::Pending,
        }
    }

    fn move_focus(&mut self, delta: isize) {
        let len = self.fields.len() as isize;
        if len == 0 {
            return;
        }
        self.focus = (self.focus as isize + delta).rem_euclid(len) as usize;
    }

    fn step_focused(&mut self, delta: isize) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            field.value.step(delta);
        }
    }

    fn flag(&self, key: FieldKey) -> bool {
        self.fields
            .iter()
            .find(|field| field.key == key)
            .is_some_and(|field| match &field.value {
                FieldValue::Toggle(value) => *value,
                FieldValue::Choice { options, selected } => {
                    options.get(*selected).is_some_and(|option| *option == "Yes")
                }
            })
    }

    fn selection(&self) -> DialogSelection {
        let id = self.target.clone().unwrap_or_default();
        match self.kind {
            DialogKind::RemoveContainer => DialogSelection::RemoveContainer {
                id,
                opts: ContainerRemoval {
                    remove_volumes: self.flag(FieldKey::RemoveVolumes),
                    remove_links: self.flag(FieldKey::RemoveLinks),
                    force: self.flag(FieldKey::Force),
                },
            },
            DialogKind::RemoveImage => DialogSelection::RemoveImage {
                id,
                opts: ImageRemoval {
                    force: self.flag(FieldKey::Force),
                    prune_children: self.flag(FieldKey::PruneChildren),
                },
            },
            DialogKind::RemoveVolume => DialogSelection::RemoveVolume {
                id,
                force: self.flag(FieldKey::Force),
            },
            DialogKind::PruneContainers => DialogSelection::Prune {
                kind: ResourceKind::Containers,
                confirmed: self.flag(FieldKey::Confirm),
            },
            DialogKind::PruneImages => DialogSelection::Prune {
                kind: ResourceKind::Images,
                confirmed: self.flag(FieldKey::Confirm),
            },
            DialogKind::PruneVolumes => DialogSelection::Prune {
                kind: ResourceKind::Volumes,
                confirmed: self.flag(FieldKey::Confirm),
            },
            DialogKind::Error => DialogSelection::Acknowledged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Dialog, DialogKind, DialogOutcome, DialogSelection, FieldValue};
    use crate::backend::{ContainerRemoval, ImageRemoval};
    use crate::input::Action;
    use crate::model::ResourceKind;

    #[test]
    fn remove_container_defaults_to_plain_removal() {
        let mut dialog = Dialog::remove_container("c1");
        assert_eq!(
            dialog.handle(&Action::Confirm),
            DialogOutcome::Confirmed(DialogSelection::RemoveContainer {
                id: "c1".to_string(),
                opts: ContainerRemoval::default(),
            })
        );
    }

    #[test]
    fn toggled_fields_are_carried_into_selection() {
        let mut dialog = Dialog::remove_container("c1");
        dialog.handle(&Action::Toggle);
        dialog.handle(&Action::Down);
        dialog.handle(&Action::Down);
        dialog.handle(&Action::Toggle);

        assert_eq!(
            dialog.handle(&Action::Confirm),
            DialogOutcome::Confirmed(DialogSelection::RemoveContainer {
                id: "c1".to_string(),
                opts: ContainerRemoval {
                    remove_volumes: true,
                    remove_links: false,
                    force: true,
                },
            })
        );
    }

    #[test]
    fn focus_wraps_around_fields() {
        let mut dialog = Dialog::remove_image("sha256:abc");
        dialog.handle(&Action::Up);
        assert_eq!(dialog.focus(), 1);
        dialog.handle(&Action::Down);
        assert_eq!(dialog.focus(), 0);

        dialog.handle(&Action::Up);
        dialog.handle(&Action::Toggle);
        assert_eq!(
            dialog.handle(&Action::Confirm),
            DialogOutcome::Confirmed(DialogSelection::RemoveImage {
                id: "sha256:abc".to_string(),
                opts: ImageRemoval {
                    force: false,
                    prune_children: true,
                },
            })
        );
    }

    #[test]
    fn prune_requires_explicit_yes() {
        let mut dialog = Dialog::prune(ResourceKind::Volumes);
        assert_eq!(dialog.kind(), DialogKind::PruneVolumes);
        assert_eq!(
            dialog.clone().handle(&Action::Confirm),
            DialogOutcome::Confirmed(DialogSelection::Prune {
                kind: ResourceKind::Volumes,
                confirmed: false,
            })
        );

        dialog.handle(&Action::Right);
        assert_eq!(
            dialog.fields()[0].value,
            FieldValue::Choice {
                options: &["No", "Yes"],
                selected: 1,
            }
        );
        assert_eq!(
            dialog.handle(&Action::Confirm),
            DialogOutcome::Confirmed(DialogSelection::Prune {
                kind: ResourceKind::Volumes,
                confirmed: true,
            })
        );
    }

    #[test]
    fn choice_wraps_in_both_directions() {
        let mut dialog = Dialog::prune(ResourceKind::Images);
        dialog.handle(&Action::Left);
        assert!(dialog.fields()[0].value.display().contains("<Yes>"));
        dialog.handle(&Action::Left);
        assert!(dialog.fields()[0].value.display().contains("<No>"));
    }

    #[test]
    fn back_cancels_without_selection() {
        let mut dialog = Dialog::remove_volume("data");
        dialog.handle(&Action::Toggle);
        assert_eq!(dialog.handle(&Action::Back), DialogOutcome::Cancelled);
    }

    #[test]
    fn unrelated_actions_keep_dialog_pending() {
        let mut dialog = Dialog::remove_volume("data");
        for action in [
            Action::NextTab,
            Action::PrevTab,
            Action::Quit,
            Action::Delete,
            Action::Prune,
        ] {
            assert_eq!(dialog.handle(&action), DialogOutcome::Pending);
        }
        assert_eq!(dialog.target(), Some("data"));
    }

    #[test]
    fn error_dialog_is_acknowledged_on_confirm() {
        let mut dialog = Dialog::error("boom");
        assert_eq!(dialog.message(), "boom");
        assert!(dialog.fields().is_empty());
        dialog.handle(&Action::Down);
        assert_eq!(
            dialog.handle(&Action::Confirm),
            DialogOutcome::Confirmed(DialogSelection::Acknowledged)
        );
    }
}

use crate::model::{ResourceItem, ResourceKind};
use chrono::{DateTime, Local};

/// Ordered listing of one resource kind with a filter and a cursor into the
/// filtered view.
#[derive(Debug, Clone)]
pub struct ResourceList {
    kind: ResourceKind,
    items: Vec<ResourceItem>,
    filter: String,
    selected: Option<usize>,
    view_width: u16,
    view_height: u16,
    last_refreshed: Option<DateTime<Local>>,
    error: Option<String>,
}

impl ResourceList {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            items: Vec::new(),
            filter: String::new(),
            selected: None,
            view_width: 80,
            view_height: 20,
            last_refreshed: None,
            error: None,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn items(&self) -> &[ResourceItem] {
        &self.items
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Local>> {
        self.last_refreshed
    }

    pub fn viewport(&self) -> (u16, u16) {
        (self.view_width, self.view_height)
    }

    pub fn visible_items(&self) -> Vec<&ResourceItem> {
        self.items
            .iter()
            .filter(|item| item.matches_filter(&self.filter))
            .collect()
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_item(&self) -> Option<&ResourceItem> {
        let index = self.selected?;
        self.visible_items().into_iter().nth(index)
    }

    pub fn selected_id(&self) -> Option<String> {
        self.selected_item().map(|item| item.id().to_string())
    }

    /// Swaps in a fresh listing, keeping the cursor on the same id when it
    /// survived the refresh.
    pub fn replace_items(&mut self, items: Vec<ResourceItem>, refreshed_at: DateTime<Local>) {
        let previous = self.selected_id();
        self.items = items;
        self.last_refreshed = Some(refreshed_at);
        self.error = None;
        self.reselect(previous.as_deref());
    }

    /// Keeps the cached items and records why the refresh did not land.
    pub fn set_error(&mut self, error: impl Into<String>, refreshed_at: DateTime<Local>) {
        self.error = Some(error.into());
        self.last_refreshed = Some(refreshed_at);
    }

    pub fn apply_filter(&mut self, text: impl Into<String>) {
        let previous = self.selected_id();
        self.filter = text.into();
        self.reselect(previous.as_deref());
    }

    pub fn set_viewport(&mut self, width: u16, height: u16) {
        self.view_width = width.max(1);
        self.view_height = height.max(1);
    }

    pub fn page_step(&self) -> isize {
        self.view_height.max(1) as isize
    }

    pub fn move_selection(&mut self, delta: isize) {
        let len = self.visible_items().len();
        if len == 0 {
            self.selected = None;
            return;
        }

        let current = self.selected.unwrap_or(0) as isize;
        let next = (current + delta).clamp(0, len as isize - 1);
        self.selected = Some(next as usize);
    }

    pub fn select_first(&mut self) {
        self.selected = if self.visible_items().is_empty() {
            None
        } else {
            Some(0)
        };
    }

    pub fn select_last(&mut self) {
        self.selected = self.visible_items().len().checked_sub(1);
    }

    fn reselect(&mut self, previous_id: Option<&str>) {
        let visible = self.visible_items();
        if visible.is_empty() {
            self.selected = None;
            return;
        }

        let by_id =
            previous_id.and_then(|id| visible.iter().position(|item| item.id() == id));
        self.selected = Some(by_id.unwrap_or(0));
    }
}

#[cfg(test)]
mod tests {
    use super::ResourceList;
    use crate::model::{ContainerItem, ResourceItem, ResourceKind};
    use chrono::Local;

    fn container(id: &str, name: &str) -> ResourceItem {
        ResourceItem::Container(ContainerItem {
            id: id.to_string(),
            names: vec![format!("/{name}")],
            image: "alpine".to_string(),
            state: "running".to_string(),
            ..ContainerItem::default()
        })
    }

    fn list_with(ids: &[(&str, &str)]) -> ResourceList {
        let mut list = ResourceList::new(ResourceKind::Containers);
        list.replace_items(
            ids.iter().map(|(id, name)| container(id, name)).collect(),
            Local::now(),
        );
        list
    }

    #[test]
    fn first_listing_selects_first_item() {
        let list = list_with(&[("c1", "web"), ("c2", "db")]);
        assert_eq!(list.selected_index(), Some(0));
        assert_eq!(list.selected_id().as_deref(), Some("c1"));
    }

    #[test]
    fn refresh_keeps_selection_on_same_id() {
        let mut list = list_with(&[("c1", "web"), ("c2", "db"), ("c3", "cache")]);
        list.move_selection(2);
        assert_eq!(list.selected_id().as_deref(), Some("c3"));

        list.replace_items(
            vec![container("c3", "cache"), container("c1", "web")],
            Local::now(),
        );
        assert_eq!(list.selected_index(), Some(0));
        assert_eq!(list.selected_id().as_deref(), Some("c3"));
    }

    #[test]
    fn refresh_removing_selected_item_falls_back_to_first() {
        let mut list = list_with(&[("c1", "web"), ("c2", "db"), ("c3", "cache")]);
        list.select_last();

        list.replace_items(vec![container("c1", "web")], Local::now());
        assert_eq!(list.selected_index(), Some(0));
        assert!(list.selected_item().is_some());
    }

    #[test]
    fn refresh_to_empty_clears_cursor() {
        let mut list = list_with(&[("c1", "web")]);
        list.replace_items(Vec::new(), Local::now());
        assert_eq!(list.selected_index(), None);
        assert!(list.selected_item().is_none());
    }

    #[test]
    fn filter_narrows_view_without_dropping_items() {
        let mut list = list_with(&[("c1", "web"), ("c2", "db"), ("c3", "webhook")]);
        list.apply_filter("web");

        assert_eq!(list.items().len(), 3);
        let visible = list
            .visible_items()
            .into_iter()
            .map(|item| item.id().to_string())
            .collect::<Vec<_>>();
        assert_eq!(visible, vec!["c1".to_string(), "c3".to_string()]);

        list.apply_filter("nothing-matches");
        assert_eq!(list.selected_index(), None);

        list.apply_filter("");
        assert_eq!(list.visible_items().len(), 3);
        assert_eq!(list.selected_index(), Some(0));
    }

    #[test]
    fn filter_keeps_selected_item_when_still_visible() {
        let mut list = list_with(&[("c1", "web"), ("c2", "db"), ("c3", "webhook")]);
        list.select_last();
        list.apply_filter("web");
        assert_eq!(list.selected_id().as_deref(), Some("c3"));
        assert_eq!(list.selected_index(), Some(1));
    }

    #[test]
    fn movement_is_clamped_to_visible_range() {
        let mut list = list_with(&[("c1", "web"), ("c2", "db")]);
        list.move_selection(10);
        assert_eq!(list.selected_index(), Some(1));
        list.move_selection(-10);
        assert_eq!(list.selected_index(), Some(0));

        let mut empty = ResourceList::new(ResourceKind::Volumes);
        empty.move_selection(1);
        empty.select_last();
        assert_eq!(empty.selected_index(), None);
    }

    #[test]
    fn error_keeps_cached_items() {
        let mut list = list_with(&[("c1", "web")]);
        list.set_error("daemon unavailable", Local::now());
        assert_eq!(list.items().len(), 1);
        assert_eq!(list.error(), Some("daemon unavailable"));

        list.replace_items(vec![container("c1", "web")], Local::now());
        assert!(list.error().is_none());
    }
}

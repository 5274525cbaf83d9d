use chrono::{DateTime, Local};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ResourceKind {
    Images,
    Containers,
    Volumes,
}

impl ResourceKind {
    pub const ALL: [Self; 3] = [Self::Images, Self::Containers, Self::Volumes];

    pub fn title(self) -> &'static str {
        match self {
            Self::Images => "Images",
            Self::Containers => "Containers",
            Self::Volumes => "Volumes",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::Images => 0,
            Self::Containers => 1,
            Self::Volumes => 2,
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::Images => Self::Containers,
            Self::Containers => Self::Volumes,
            Self::Volumes => Self::Images,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Self::Images => Self::Volumes,
            Self::Containers => Self::Images,
            Self::Volumes => Self::Containers,
        }
    }

    pub fn headers(self) -> &'static [&'static str] {
        match self {
            Self::Images => &["Repository:Tag", "ID", "Size", "Created"],
            Self::Containers => &["Name", "Image", "State", "Status"],
            Self::Volumes => &["Name", "Driver", "Scope"],
        }
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title())
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct ImageItem {
    pub id: String,
    pub repo_tags: Vec<String>,
    pub size: i64,
    pub created: i64,
    pub containers: i64,
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct ContainerItem {
    pub id: String,
    pub names: Vec<String>,
    pub image: String,
    pub state: String,
    pub status: String,
    pub ports: Vec<String>,
    pub created: i64,
    pub size_rw: Option<i64>,
    pub size_root_fs: Option<i64>,
}

impl ContainerItem {
    pub fn name(&self) -> &str {
        self.names
            .first()
            .map(|name| name.trim_start_matches('/'))
            .unwrap_or("-")
    }

    pub fn size(&self) -> Option<ContainerSize> {
        match (self.size_rw, self.size_root_fs) {
            (Some(size_rw), Some(root_fs)) => Some(ContainerSize { size_rw, root_fs }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct VolumeItem {
    pub name: String,
    pub driver: String,
    pub mountpoint: String,
    pub scope: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ResourceItem {
    Image(ImageItem),
    Container(ContainerItem),
    Volume(VolumeItem),
}

impl ResourceItem {
    pub fn id(&self) -> &str {
        match self {
            Self::Image(image) => &image.id,
            Self::Container(container) => &container.id,
            Self::Volume(volume) => &volume.name,
        }
    }

    pub fn columns(&self) -> Vec<String> {
        match self {
            Self::Image(image) => vec![
                image
                    .repo_tags
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "<none>:<none>".to_string()),
                short_id(&image.id).to_string(),
                format_bytes(image.size),
                format_timestamp(image.created),
            ],
            Self::Container(container) => vec![
                container.name().to_string(),
                container.image.clone(),
                container.state.clone(),
                container.status.clone(),
            ],
            Self::Volume(volume) => vec![
                volume.name.clone(),
                volume.driver.clone(),
                volume.scope.clone(),
            ],
        }
    }

    pub fn matches_filter(&self, query: &str) -> bool {
        let query = query.trim();
        if query.is_empty() {
            return true;
        }

        let query_lower = query.to_ascii_lowercase();
        if self.id().to_ascii_lowercase().contains(&query_lower) {
            return true;
        }

        self.columns()
            .iter()
            .any(|column| column.to_ascii_lowercase().contains(&query_lower))
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct ContainerSize {
    pub size_rw: i64,
    pub root_fs: i64,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PruneReport {
    pub kind: ResourceKind,
    pub removed: usize,
    pub space_reclaimed: u64,
}

impl PruneReport {
    pub fn summary(&self) -> String {
        format!(
            "Pruned {} {}, reclaimed {}",
            self.removed,
            self.kind.title().to_ascii_lowercase(),
            format_bytes(self.space_reclaimed as i64)
        )
    }
}

pub fn short_id(id: &str) -> &str {
    let id = id.strip_prefix("sha256:").unwrap_or(id);
    id.get(..12).unwrap_or(id)
}

pub fn format_bytes(bytes: i64) -> String {
    const UNITS: [(&str, i64); 4] = [
        ("GB", 1_000_000_000),
        ("MB", 1_000_000),
        ("kB", 1_000),
        ("B", 1),
    ];

    if bytes <= 0 {
        return "0B".to_string();
    }

    for (suffix, unit) in UNITS {
        if bytes >= unit {
            let whole = bytes / unit;
            let decimal = ((bytes % unit) * 10) / unit;
            if decimal == 0 || unit == 1 {
                return format!("{whole}{suffix}");
            }
            return format!("{whole}.{decimal}{suffix}");
        }
    }

    format!("{bytes}B")
}

pub fn format_timestamp(unix_seconds: i64) -> String {
    DateTime::from_timestamp(unix_seconds, 0)
        .map(|at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::{ContainerItem, ResourceItem, ResourceKind, format_bytes, short_id};

    #[test]
    fn next_and_prev_wrap_at_both_ends() {
        assert_eq!(ResourceKind::Volumes.next(), ResourceKind::Images);
        assert_eq!(ResourceKind::Images.prev(), ResourceKind::Volumes);

        for start in ResourceKind::ALL {
            assert_eq!(start.next().prev(), start);
            assert_eq!(start.next().next().next(), start);
        }
    }

    #[test]
    fn index_matches_all_order() {
        for (position, kind) in ResourceKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), position);
        }
    }

    #[test]
    fn container_name_strips_leading_slash() {
        let container = ContainerItem {
            id: "c1".to_string(),
            names: vec!["/web".to_string()],
            ..ContainerItem::default()
        };
        assert_eq!(container.name(), "web");
    }

    #[test]
    fn filter_matches_id_and_columns() {
        let item = ResourceItem::Container(ContainerItem {
            id: "abc123".to_string(),
            names: vec!["/postgres".to_string()],
            image: "postgres:16".to_string(),
            state: "running".to_string(),
            ..ContainerItem::default()
        });

        assert!(item.matches_filter(""));
        assert!(item.matches_filter("ABC"));
        assert!(item.matches_filter("gres:1"));
        assert!(!item.matches_filter("redis"));
    }

    #[test]
    fn bytes_and_ids_are_compacted() {
        assert_eq!(format_bytes(0), "0B");
        assert_eq!(format_bytes(512), "512B");
        assert_eq!(format_bytes(1_500_000), "1.5MB");
        assert_eq!(format_bytes(2_000_000_000), "2GB");
        assert_eq!(short_id("sha256:0123456789abcdef"), "0123456789ab");
        assert_eq!(short_id("short"), "short");
    }
}

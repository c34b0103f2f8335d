//! Change detection between two desired configurations and the grouping of
//! changed fields into remote operations.

use std::collections::BTreeSet;

use crate::types::{DesiredConfig, DiskUpdate, SizingMode};

/// A user-settable machine attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    CloudspaceId,
    Name,
    Description,
    Sizing,
    ImageId,
    Disksize,
    Iops,
    Userdata,
}

/// Fields whose value differs between the previously applied configuration
/// and the newly requested one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    fields: BTreeSet<Field>,
}

impl ChangeSet {
    pub fn between(prior: &DesiredConfig, desired: &DesiredConfig) -> Self {
        let candidates = [
            (Field::CloudspaceId, prior.cloudspace_id != desired.cloudspace_id),
            (Field::Name, prior.name != desired.name),
            (Field::Description, prior.description != desired.description),
            (Field::Sizing, prior.sizing != desired.sizing),
            (Field::ImageId, prior.image_id != desired.image_id),
            (Field::Disksize, prior.disksize != desired.disksize),
            (Field::Iops, prior.iops != desired.iops),
            (Field::Userdata, prior.userdata != desired.userdata),
        ];

        Self {
            fields: candidates
                .into_iter()
                .filter_map(|(field, changed)| changed.then_some(field))
                .collect(),
        }
    }

    pub fn contains(&self, field: Field) -> bool {
        self.fields.contains(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Field> + '_ {
        self.fields.iter().copied()
    }
}

impl FromIterator<Field> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// One remote call covering a cluster of related fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationGroup {
    Metadata { name: String, description: String },
    Resize(SizingMode),
    Disk(DiskUpdate),
}

impl OperationGroup {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Metadata { .. } => "metadata",
            Self::Resize(_) => "resize",
            Self::Disk(_) => "disk",
        }
    }
}

/// Map a change set onto operation groups, always ordered metadata, resize,
/// disk.
///
/// Immutable fields and userdata never produce a group. Dropping `iops` from
/// the configuration does not produce one either, since IO limits cannot be
/// cleared remotely.
pub fn classify(changes: &ChangeSet, desired: &DesiredConfig) -> Vec<OperationGroup> {
    let mut groups = Vec::new();

    if changes.contains(Field::Name) || changes.contains(Field::Description) {
        groups.push(OperationGroup::Metadata {
            name: desired.name.clone(),
            description: desired.description.clone(),
        });
    }

    if changes.contains(Field::Sizing) {
        groups.push(OperationGroup::Resize(desired.sizing));
    }

    let disk = DiskUpdate {
        size: changes.contains(Field::Disksize).then_some(desired.disksize),
        iops: if changes.contains(Field::Iops) { desired.iops } else { None },
    };
    if !disk.is_empty() {
        groups.push(OperationGroup::Disk(disk));
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DesiredConfig {
        DesiredConfig {
            cloudspace_id: 1,
            name: "web1".into(),
            description: "frontend".into(),
            sizing: SizingMode::ByResources { memory: 1024, vcpus: 2 },
            image_id: 7,
            disksize: 20,
            iops: Some(500),
            userdata: None,
        }
    }

    fn plan(desired: &DesiredConfig) -> Vec<OperationGroup> {
        classify(&ChangeSet::between(&config(), desired), desired)
    }

    #[test]
    fn identical_configs_have_no_changes() {
        let changes = ChangeSet::between(&config(), &config());
        assert!(changes.is_empty());
        assert!(classify(&changes, &config()).is_empty());
    }

    #[test]
    fn description_only_is_single_metadata_group() {
        let desired = DesiredConfig {
            description: "backend".into(),
            ..config()
        };
        assert_eq!(
            plan(&desired),
            vec![OperationGroup::Metadata {
                name: "web1".into(),
                description: "backend".into(),
            }]
        );
    }

    #[test]
    fn name_and_description_share_one_group() {
        let desired = DesiredConfig {
            name: "web2".into(),
            description: "backend".into(),
            ..config()
        };
        let groups = plan(&desired);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].label(), "metadata");
    }

    #[test]
    fn groups_follow_fixed_order() {
        let desired = DesiredConfig {
            name: "web2".into(),
            sizing: SizingMode::ByResources { memory: 1024, vcpus: 4 },
            disksize: 40,
            ..config()
        };
        let labels: Vec<_> = plan(&desired).iter().map(OperationGroup::label).collect();
        assert_eq!(labels, vec!["metadata", "resize", "disk"]);
    }

    #[test]
    fn disk_group_carries_only_changed_attributes() {
        let desired = DesiredConfig {
            disksize: 40,
            ..config()
        };
        assert_eq!(
            plan(&desired),
            vec![OperationGroup::Disk(DiskUpdate {
                size: Some(40),
                iops: None
            })]
        );

        let desired = DesiredConfig {
            iops: Some(1000),
            ..config()
        };
        assert_eq!(
            plan(&desired),
            vec![OperationGroup::Disk(DiskUpdate {
                size: None,
                iops: Some(1000)
            })]
        );
    }

    #[test]
    fn removing_iops_is_not_an_operation() {
        let desired = DesiredConfig {
            iops: None,
            ..config()
        };
        let changes = ChangeSet::between(&config(), &desired);
        assert!(changes.contains(Field::Iops));
        assert!(classify(&changes, &desired).is_empty());
    }

    #[test]
    fn switching_sizing_mode_is_a_resize() {
        let desired = DesiredConfig {
            sizing: SizingMode::BySizeId(3),
            ..config()
        };
        assert_eq!(plan(&desired), vec![OperationGroup::Resize(SizingMode::BySizeId(3))]);
    }

    #[test]
    fn userdata_and_immutable_fields_produce_no_groups() {
        let changes: ChangeSet = [Field::Userdata, Field::ImageId, Field::CloudspaceId]
            .into_iter()
            .collect();
        assert!(classify(&changes, &config()).is_empty());
    }
}

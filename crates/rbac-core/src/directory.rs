//! Validated group management on top of a [`GroupRepository`].

use tracing::{debug, info};

use crate::error::{ConsoleError, ConsoleResult};
use crate::hierarchy::{self, GroupTreeNode};
use crate::models::group::{CreateGroup, Group, GroupType, ListGroups, UpdateGroup};
use crate::models::page::PageRequest;
use crate::repository::GroupRepository;

/// Page size requested when the whole hierarchy is needed.
const FULL_LIST_PAGE_SIZE: u32 = 10_000;

/// Editable form state for creating or editing a group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupDraft {
    /// `Some` when editing an existing group.
    pub id: Option<String>,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub group_type: GroupType,
    pub parent_id: Option<String>,
    pub is_enabled: bool,
}

impl GroupDraft {
    pub fn new(group_type: GroupType) -> Self {
        Self {
            id: None,
            code: String::new(),
            name: String::new(),
            description: None,
            group_type,
            parent_id: None,
            is_enabled: true,
        }
    }

    pub fn from_group(group: &Group) -> Self {
        Self {
            id: Some(group.id.clone()),
            code: group.code.clone(),
            name: group.name.clone(),
            description: group.description.clone(),
            group_type: group.group_type,
            parent_id: group.parent_id.clone(),
            is_enabled: group.is_enabled,
        }
    }

    /// Legal parents for the draft's current type.
    pub fn candidates<'a>(&self, groups: &'a [Group]) -> Vec<&'a Group> {
        hierarchy::parent_candidates(groups, self.group_type, self.id.as_deref())
    }

    /// Change the type, dropping the parent selection if it is not a legal
    /// candidate for the new type.
    pub fn set_type(&mut self, group_type: GroupType, groups: &[Group]) {
        self.group_type = group_type;
        if let Some(parent_id) = self.parent_id.as_deref() {
            let still_valid = self.candidates(groups).iter().any(|g| g.id == parent_id);
            if !still_valid {
                debug!(parent_id, %group_type, "clearing parent selection after type change");
                self.parent_id = None;
            }
        }
    }

    pub fn validate(&self, groups: &[Group]) -> ConsoleResult<()> {
        if self.name.trim().is_empty() {
            return Err(ConsoleError::validation("name", "group name is required"));
        }
        hierarchy::validate_placement(
            groups,
            self.id.as_deref(),
            self.group_type,
            self.parent_id.as_deref(),
        )
    }

    fn into_create(self) -> CreateGroup {
        CreateGroup {
            code: self.code,
            name: self.name,
            description: self.description,
            group_type: self.group_type,
            parent_id: self.parent_id.filter(|p| !p.is_empty()),
            is_enabled: self.is_enabled,
        }
    }

    fn into_update(self) -> ConsoleResult<UpdateGroup> {
        let id = self
            .id
            .ok_or_else(|| ConsoleError::validation("id", "an existing group id is required"))?;
        Ok(UpdateGroup {
            id,
            code: self.code,
            name: self.name,
            description: self.description,
            group_type: self.group_type,
            parent_id: self.parent_id.filter(|p| !p.is_empty()),
            is_enabled: self.is_enabled,
        })
    }
}

/// Group operations that enforce hierarchy rules before any write reaches
/// the server.
pub struct GroupDirectory<R: GroupRepository> {
    repo: R,
}

impl<R: GroupRepository> GroupDirectory<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Fetch every group as a flat list, following pages until the total
    /// the server reports has been read.
    pub async fn all(&self) -> ConsoleResult<Vec<Group>> {
        let mut groups: Vec<Group> = Vec::new();
        let mut page_num = 1;
        loop {
            let page = self
                .repo
                .list(ListGroups {
                    page: PageRequest {
                        page_num,
                        page_size: FULL_LIST_PAGE_SIZE,
                        ..Default::default()
                    },
                    ..Default::default()
                })
                .await?;

            let total = usize::try_from(page.page.total).unwrap_or(usize::MAX);
            if page.items.is_empty() && groups.len() < total {
                return Err(ConsoleError::Decode(format!(
                    "group list ended after {} of {total} groups",
                    groups.len()
                )));
            }
            groups.extend(page.items);
            if groups.len() >= total {
                break;
            }
            page_num += 1;
        }
        debug!(groups = groups.len(), pages = page_num, "fetched full group list");
        Ok(groups)
    }

    /// Fetch and rebuild the forest.
    pub async fn tree(&self) -> ConsoleResult<Vec<GroupTreeNode>> {
        let groups = self.all().await?;
        Ok(hierarchy::build_tree(&groups))
    }

    pub async fn create(&self, draft: GroupDraft) -> ConsoleResult<Group> {
        if draft.id.is_some() {
            return Err(ConsoleError::validation("id", "a new group cannot carry an id"));
        }
        let groups = self.all().await?;
        draft.validate(&groups)?;

        let group = self.repo.create(draft.into_create()).await?;
        info!(group_id = %group.id, group_type = %group.group_type, "group created");
        Ok(group)
    }

    pub async fn update(&self, draft: GroupDraft) -> ConsoleResult<()> {
        let groups = self.all().await?;
        draft.validate(&groups)?;

        let input = draft.into_update()?;
        let id = input.id.clone();
        self.repo.update(input).await?;
        info!(group_id = %id, "group updated");
        Ok(())
    }

    /// Delete a group. Returns the ids of the descendants the server removes
    /// along with it.
    pub async fn delete(&self, id: &str) -> ConsoleResult<Vec<String>> {
        let groups = self.all().await?;
        let removed = hierarchy::descendant_ids(&groups, id);
        self.repo.delete(id).await?;
        info!(group_id = %id, descendants = removed.len(), "group deleted");
        Ok(removed)
    }
}

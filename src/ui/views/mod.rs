mod checklist_board;
mod checklist_workflows;
mod resource_list;
mod settings;

pub use checklist_board::ChecklistBoardView;
pub use checklist_workflows::ChecklistWorkflowsView;
pub use resource_list::ResourceListView;
pub use settings::{BusinessView, RecordPane};

use crate::cache::QueryCache;
use crate::resources::{
  Agency, CompanyEmail, DocumentType, EmailTemplate, ManualPaymentDetail, Tag, TaxSetting, Workflow,
};
use crate::ui::view::View;

/// Root view for a command name from [`crate::commands::COMMANDS`]
pub fn root_view(name: &str, cache: QueryCache) -> Option<Box<dyn View>> {
  let view: Box<dyn View> = match name {
    "workflows" => Box::new(ResourceListView::<Workflow>::new(cache)),
    "tags" => Box::new(ResourceListView::<Tag>::new(cache)),
    "doctypes" => Box::new(ResourceListView::<DocumentType>::new(cache)),
    "taxes" => Box::new(ResourceListView::<TaxSetting>::new(cache)),
    "payments" => Box::new(ResourceListView::<ManualPaymentDetail>::new(cache)),
    "emails" => Box::new(ResourceListView::<CompanyEmail>::new(cache)),
    "templates" => Box::new(ResourceListView::<EmailTemplate>::new(cache)),
    "checklists" => Box::new(ChecklistWorkflowsView::new(cache)),
    "business" => Box::new(BusinessView::new(cache)),
    "agency" => Box::new(RecordPane::<Agency>::new(cache)),
    _ => return None,
  };
  Some(view)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::{Credential, MemoryBackend, ResourceClient, Session};
  use crate::commands::COMMANDS;
  use std::sync::Arc;

  #[tokio::test]
  async fn test_every_panel_command_has_a_view() {
    let client = ResourceClient::new(
      Arc::new(MemoryBackend::new()),
      Session::new(Credential::new("t0k"), None),
    );
    let cache = QueryCache::new(client);
    for cmd in COMMANDS.iter().filter(|c| c.name != "quit") {
      assert!(root_view(cmd.name, cache.clone()).is_some(), "{}", cmd.name);
    }
    assert!(root_view("quit", cache).is_none());
  }
}

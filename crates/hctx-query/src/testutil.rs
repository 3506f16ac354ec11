//! Shared test fixture: a small project with a stable and a draft version.
//!
//! ```text
//! docs/
//!   intro.md   head core,   blocks Glossary (core), Advanced (extend)
//!   setup.md   head extend, blocks Install (extend)
//! ```

use hctx_core::node::NodeType;
use hctx_core::scope::RequestScope;
use hctx_store::SqliteStore;

pub const INTRO: &str = r"<head>
  <name>intro.md</name>
  <level>core</level>
  <description>Project overview and
    terminology.</description>
</head>

<core>
  <content>
Intro core body.
  </content>
</core>

<extend>
  <block>
    <name>Glossary</name>
    <level>core</level>
    <description>Core   terms
      explained</description>
    <content>- doc: a collection of text</content>
  </block>
  <block>
    <name>Advanced</name>
    <level>extend</level>
    <description>Deep dive</description>
    <content>secret</content>
  </block>
</extend>";

pub const SETUP: &str = r"<head>
  <name>Setup Guide</name>
  <level>extend</level>
  <description>Installation steps.</description>
</head>

<core>
  <content>Setup hidden body.</content>
</core>

<extend>
  <block>
    <name>Install</name>
    <description>How to install</description>
    <content>run the installer</content>
  </block>
</extend>";

pub struct Fixture {
    pub store: SqliteStore,
    pub scope: RequestScope,
    pub docs_id: String,
    pub intro_id: String,
    pub setup_id: String,
    pub stable_id: String,
    pub draft_id: String,
}

impl Fixture {
    pub fn new() -> Self {
        let store = SqliteStore::in_memory().unwrap();
        let pid = store.create_project("Hyper Docs").unwrap();
        let docs = store.create_node(&pid, None, "docs", NodeType::Folder).unwrap();
        let intro = store
            .create_node(&pid, Some(&docs.id), "intro.md", NodeType::File)
            .unwrap();
        let setup = store
            .create_node(&pid, Some(&docs.id), "setup.md", NodeType::File)
            .unwrap();

        let stable = store.create_version(&pid, Some("1.0.0"), None).unwrap();
        store.set_main_content(&pid, &stable.id, "# Hyper Docs\n\nMain document.").unwrap();
        store.set_node_content(&pid, &stable.id, &intro.id, INTRO).unwrap();
        store.set_node_content(&pid, &stable.id, &setup.id, SETUP).unwrap();
        store.publish(&pid, &stable.id).unwrap();
        store.mark_stable(&pid, &stable.id).unwrap();

        let draft = store.create_version(&pid, Some("1.1.0"), None).unwrap();

        Self {
            store,
            scope: RequestScope::new(pid),
            docs_id: docs.id,
            intro_id: intro.id,
            setup_id: setup.id,
            stable_id: stable.id,
            draft_id: draft.id,
        }
    }
}

//! Device policy and file placement objects.
//!
//! Both are optional objects whose every field is optional, so `{}` is a
//! meaningful configuration. An empty object is never sent, and an
//! absent one comes back as whatever empty object the user wrote.

use crate::bridge::{from_remote, to_remote};
use crate::codec::Codec;
use crate::describe::describe;
use anyhow::Result;
use declarative::{Attr, Attribute, object};
use smallstep::models;

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Policy {
        pub assurance: Attr<Vec<String>>,
        pub os: Attr<Vec<String>>,
        pub ownership: Attr<Vec<String>>,
        pub source: Attr<Vec<String>>,
        pub tags: Attr<Vec<String>>,
    }
}

impl Codec for Policy {
    type Api = models::Policy;

    fn to_api(&self) -> models::Policy {
        models::Policy {
            assurance: to_remote(&self.assurance),
            os: to_remote(&self.os),
            ownership: to_remote(&self.ownership),
            source: to_remote(&self.source),
            tags: to_remote(&self.tags),
        }
    }

    fn from_api(remote: models::Policy, prior: &Attr<Self>) -> Self {
        Self {
            assurance: from_remote(remote.assurance, &prior.get(|p| &p.assurance)),
            os: from_remote(remote.os, &prior.get(|p| &p.os)),
            ownership: from_remote(remote.ownership, &prior.get(|p| &p.ownership)),
            source: from_remote(remote.source, &prior.get(|p| &p.source)),
            tags: from_remote(remote.tags, &prior.get(|p| &p.tags)),
        }
    }

    fn is_vacant(remote: &models::Policy) -> bool {
        let lists = [
            &remote.assurance,
            &remote.os,
            &remote.ownership,
            &remote.source,
            &remote.tags,
        ];
        lists.iter().all(|list| list.as_ref().is_none_or(Vec::is_empty))
    }
}

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Files {
        pub root_file: Attr<String>,
        pub crt_file: Attr<String>,
        pub key_file: Attr<String>,
        pub uid: Attr<i64>,
        pub gid: Attr<i64>,
        pub mode: Attr<i64>,
    }
}

impl Codec for Files {
    type Api = models::Files;

    fn to_api(&self) -> models::Files {
        models::Files {
            root_file: to_remote(&self.root_file),
            crt_file: to_remote(&self.crt_file),
            key_file: to_remote(&self.key_file),
            uid: to_remote(&self.uid),
            gid: to_remote(&self.gid),
            mode: to_remote(&self.mode),
        }
    }

    fn from_api(remote: models::Files, prior: &Attr<Self>) -> Self {
        Self {
            root_file: from_remote(remote.root_file, &prior.get(|f| &f.root_file)),
            crt_file: from_remote(remote.crt_file, &prior.get(|f| &f.crt_file)),
            key_file: from_remote(remote.key_file, &prior.get(|f| &f.key_file)),
            uid: from_remote(remote.uid, &prior.get(|f| &f.uid)),
            gid: from_remote(remote.gid, &prior.get(|f| &f.gid)),
            mode: from_remote(remote.mode, &prior.get(|f| &f.mode)),
        }
    }

    fn is_vacant(remote: &models::Files) -> bool {
        *remote == models::Files::default()
    }
}

/// Schema of a [`Policy`] object.
pub fn policy_attribute(description: &str) -> Result<Attribute> {
    let doc = describe("policy")?;
    let list = |name: &str| Attribute::string_list().optional().description(doc.property(name));
    Ok(Attribute::object([
        ("assurance", list("assurance")),
        ("os", list("os")),
        ("ownership", list("ownership")),
        ("source", list("source")),
        ("tags", list("tags")),
    ])
    .optional()
    .description(description))
}

/// Schema of a [`Files`] object.
pub fn files_attribute(description: &str) -> Result<Attribute> {
    let doc = describe("files")?;
    let path = |name: &str| Attribute::string().optional().description(doc.property(name));
    let id = |name: &str| Attribute::int64().optional().description(doc.property(name));
    Ok(Attribute::object([
        ("root_file", path("rootFile")),
        ("crt_file", path("crtFile")),
        ("key_file", path("keyFile")),
        ("uid", id("uid")),
        ("gid", id("gid")),
        ("mode", id("mode")),
    ])
    .optional()
    .description(description))
}

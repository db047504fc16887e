//! Revision parsing: ref names, ids and `~n` / `^n` suffixes.

use gvc_refs::names;
use gvc_store::{ObjectStoreExt, RevObject};
use gvc_tree::NodeRef;
use gvc_types::ObjectId;

use crate::context::RepoContext;
use crate::error::{RepoError, RepoResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    /// `^n`: the n-th parent, `^0` is the commit itself.
    Parent(usize),
    /// `~n`: n first-parent steps.
    Ancestor(usize),
}

/// Split `master~2^` into `master` and its steps.
fn split_suffixes(spec: &str) -> RepoResult<(&str, Vec<Step>)> {
    let start = spec.find(|c: char| c == '~' || c == '^').unwrap_or(spec.len());
    let (base, mut rest) = spec.split_at(start);
    let mut steps = Vec::new();
    while let Some(op) = rest.chars().next() {
        rest = &rest[op.len_utf8()..];
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        let n = match &rest[..digits] {
            "" => 1,
            num => num
                .parse()
                .map_err(|_| RepoError::InvalidArgument(format!("bad revision {spec:?}")))?,
        };
        rest = &rest[digits..];
        steps.push(match op {
            '^' => Step::Parent(n),
            '~' => Step::Ancestor(n),
            _ => return Err(RepoError::InvalidArgument(format!("bad revision {spec:?}"))),
        });
    }
    Ok((base, steps))
}

impl RepoContext {
    /// Resolve a revision to an object id.
    ///
    /// Accepts special refs such as `HEAD`, full ref names, short branch,
    /// tag and `<remote>/<branch>` names, and full hex ids, each optionally
    /// followed by `~n` and `^n` steps. Tags are peeled only when a step
    /// needs a commit.
    pub fn rev_parse(&self, spec: &str) -> RepoResult<ObjectId> {
        let (base, steps) = split_suffixes(spec)?;
        let mut id = self.resolve_base(base)?;
        for step in steps {
            let commit = self.peel_to_commit(id)?;
            id = match step {
                Step::Parent(0) => commit,
                Step::Parent(n) => self.nth_parent(&commit, n, spec)?,
                Step::Ancestor(n) => {
                    let mut current = commit;
                    for _ in 0..n {
                        current = self.nth_parent(&current, 1, spec)?;
                    }
                    current
                }
            };
        }
        Ok(id)
    }

    /// Resolve a revision that must name a commit, peeling tags.
    pub fn resolve_commit(&self, spec: &str) -> RepoResult<ObjectId> {
        let id = self.rev_parse(spec)?;
        self.peel_to_commit(id)
    }

    /// Root tree named by a commit, tag or tree revision.
    pub fn resolve_treeish(&self, spec: &str) -> RepoResult<ObjectId> {
        let id = self.rev_parse(spec)?;
        match self.store().get(&id)? {
            RevObject::Tree(_) => Ok(id),
            RevObject::Commit(commit) => Ok(commit.tree_id),
            RevObject::Tag(tag) => self.commit_tree(&tag.target),
            other => Err(RepoError::InvalidArgument(format!(
                "{spec} is a {}, not a tree-ish",
                other.kind()
            ))),
        }
    }

    /// Resolve `<treeish>:<path>` to the node stored there.
    pub fn resolve_node(&self, spec: &str) -> RepoResult<NodeRef> {
        let Some((treeish, p)) = spec.split_once(':') else {
            return Err(RepoError::InvalidArgument(format!(
                "expected <ref>:<path>, got {spec:?}"
            )));
        };
        let p = p.trim_matches(gvc_tree::path::SEPARATOR);
        if p.is_empty() {
            return Err(RepoError::InvalidArgument(format!("empty path in {spec:?}")));
        }
        let tree = self.resolve_treeish(treeish)?;
        self.editor()
            .lookup(&tree, p)?
            .ok_or_else(|| RepoError::NotFound(spec.to_string()))
    }

    fn resolve_base(&self, base: &str) -> RepoResult<ObjectId> {
        if base.is_empty() {
            return Err(RepoError::InvalidArgument("empty revision".into()));
        }
        let refs = self.refs();
        if names::SPECIAL_REFS.contains(&base) || base.starts_with("refs/") {
            return refs
                .resolve(base)?
                .ok_or_else(|| RepoError::NotFound(base.to_string()));
        }
        if base.len() == 64 {
            if let Ok(id) = ObjectId::from_hex(base) {
                return if self.store().exists(&id)? {
                    Ok(id)
                } else {
                    Err(RepoError::NotFound(base.to_string()))
                };
            }
        }
        for candidate in [
            names::branch_ref(base),
            names::tag_ref(base),
            format!("{}{base}", names::REMOTES_PREFIX),
        ] {
            if let Some(id) = refs.resolve(&candidate)? {
                return Ok(id);
            }
        }
        Err(RepoError::NotFound(base.to_string()))
    }

    /// Follow tags down to the commit they name.
    pub(crate) fn peel_to_commit(&self, id: ObjectId) -> RepoResult<ObjectId> {
        let mut current = id;
        loop {
            match self.store().get(&current)? {
                RevObject::Commit(_) => return Ok(current),
                RevObject::Tag(tag) => current = tag.target,
                other => {
                    return Err(RepoError::InvalidArgument(format!(
                        "{} is a {}, not a commit",
                        current.short_hex(),
                        other.kind()
                    )))
                }
            }
        }
    }

    fn nth_parent(&self, commit: &ObjectId, n: usize, spec: &str) -> RepoResult<ObjectId> {
        self.store()
            .get_commit(commit)?
            .parents
            .get(n - 1)
            .copied()
            .ok_or_else(|| RepoError::NotFound(spec.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::*;
    use gvc_refs::RefValue;

    #[test]
    fn suffix_parsing() {
        assert_eq!(split_suffixes("HEAD").unwrap(), ("HEAD", vec![]));
        assert_eq!(
            split_suffixes("master~2^").unwrap(),
            ("master", vec![Step::Ancestor(2), Step::Parent(1)])
        );
        assert_eq!(split_suffixes("x^2~").unwrap(), ("x", vec![Step::Parent(2), Step::Ancestor(1)]));
        assert!(split_suffixes("x~99999999999999999999999").is_err());
    }

    #[test]
    fn branches_tags_and_ids() {
        let repo = repo();
        let first = commit_parks(&repo, &["1"], "first");
        let second = commit_parks(&repo, &["2"], "second");

        assert_eq!(repo.rev_parse("HEAD").unwrap(), second);
        assert_eq!(repo.rev_parse("master").unwrap(), second);
        assert_eq!(repo.rev_parse("refs/heads/master").unwrap(), second);
        assert_eq!(repo.rev_parse("HEAD~1").unwrap(), first);
        assert_eq!(repo.rev_parse("HEAD^").unwrap(), first);
        assert_eq!(repo.rev_parse("HEAD^0").unwrap(), second);
        assert_eq!(repo.rev_parse(&second.to_hex()).unwrap(), second);

        repo.create_tag("v1", "HEAD~", "first release").unwrap();
        assert_eq!(repo.resolve_commit("v1").unwrap(), first);
        assert_eq!(repo.rev_parse("v1~0").unwrap(), first);

        repo.refs()
            .set(&gvc_refs::names::remote_ref("origin", "master"), RefValue::Direct(first))
            .unwrap();
        assert_eq!(repo.rev_parse("origin/master").unwrap(), first);
    }

    #[test]
    fn unresolvable_revisions() {
        let repo = repo();
        assert_eq!(repo.rev_parse("HEAD").unwrap_err().kind(), ErrorKind::NotFound);
        commit_parks(&repo, &["1"], "only");
        assert_eq!(repo.rev_parse("HEAD~1").unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(repo.rev_parse("nope").unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(repo.rev_parse("").unwrap_err().kind(), ErrorKind::InvalidArgument);
        let absent = ObjectId::from_bytes(b"absent").to_hex();
        assert_eq!(repo.rev_parse(&absent).unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn treeish_and_nodes() {
        let repo = repo();
        let c = commit_parks(&repo, &["1", "2"], "two parks");
        let tree = repo.resolve_treeish("HEAD").unwrap();
        assert_eq!(tree, repo.commit_tree(&c).unwrap());
        assert_eq!(repo.resolve_treeish(&tree.to_hex()).unwrap(), tree);

        let node = repo.resolve_node("HEAD:parks/2").unwrap();
        assert_eq!(node.path(), "parks/2");
        assert!(repo.resolve_node("HEAD:parks").unwrap().is_tree());
        assert_eq!(repo.resolve_node("HEAD:parks/9").unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(repo.resolve_node("HEAD").unwrap_err().kind(), ErrorKind::InvalidArgument);

        repo.work()
            .insert("parks", "3", &park("three", 3.0, 0.0), &park_type())
            .unwrap();
        assert!(repo.resolve_node("WORK_HEAD:parks/3").is_ok());
        assert_eq!(repo.resolve_node("STAGE_HEAD:parks/3").unwrap_err().kind(), ErrorKind::NotFound);

        let feature = repo.resolve_node("HEAD:parks/1").unwrap();
        assert_eq!(
            repo.resolve_treeish(&feature.object_id().to_hex()).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
    }
}

//! Scriptable in-memory platform
//!
//! Implements [`RemoteApi`] over plain in-process maps so engine flows
//! can be exercised without a real cloud. Asynchronous provisioning and
//! deletion are scripted in numbers of reads, which keeps polling tests
//! deterministic regardless of wall-clock intervals.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use stratus_cloud::{AttrMap, CloudError, Filter, RemoteApi, RemoteObject, Result};

/// Which logical call a failure script applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    List,
    Get,
    Create,
    Update,
    Delete,
}

/// Counts of calls the fake has served, by operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounters {
    pub lists: u64,
    pub gets: u64,
    pub creates: u64,
    pub updates: u64,
    pub deletes: u64,
}

/// One recorded partial update, in call order.
#[derive(Debug, Clone)]
pub struct UpdateRecord {
    pub kind: String,
    pub id: String,
    pub patch: AttrMap,
}

type ErrorFactory = Box<dyn Fn() -> CloudError + Send + Sync>;

#[derive(Clone)]
struct StatusScript {
    ready: String,
    /// Pending status plus the number of reads that still see it.
    pending: Option<(String, u32)>,
}

struct Embed {
    parent_kind: String,
    related_kind: String,
    parent_attr: String,
    embed_attr: String,
}

struct Seed {
    parent_kind: String,
    related_kind: String,
    parent_attr: String,
    templates: Vec<AttrMap>,
}

#[derive(Default)]
struct Inner {
    objects: HashMap<String, BTreeMap<String, RemoteObject>>,
    next_id: u64,
    status_scripts: HashMap<String, StatusScript>,
    delete_scripts: HashMap<String, u32>,
    pending_creates: HashMap<(String, String), u32>,
    pending_deletes: HashMap<(String, String), u32>,
    embeds: Vec<Embed>,
    seeds: Vec<Seed>,
    failures: HashMap<(String, Op), ErrorFactory>,
    counters: CallCounters,
    updates: Vec<UpdateRecord>,
}

impl Inner {
    fn allocate_id(&mut self, kind: &str) -> String {
        self.next_id += 1;
        format!("{}-{:04}", kind, self.next_id)
    }

    fn insert_object(&mut self, kind: &str, object: RemoteObject) {
        self.objects
            .entry(kind.to_string())
            .or_default()
            .insert(object.id.clone(), object);
    }

    /// Materialize embedded related collections onto a served snapshot.
    fn render(&self, kind: &str, object: &RemoteObject) -> RemoteObject {
        let mut rendered = object.clone();
        for embed in self.embeds.iter().filter(|e| e.parent_kind == kind) {
            let entries: Vec<Value> = self
                .objects
                .get(&embed.related_kind)
                .map(|store| {
                    store
                        .values()
                        .filter(|entry| {
                            entry.attr_str(&embed.parent_attr) == Some(object.id.as_str())
                        })
                        .map(|entry| {
                            let mut fields = entry.attributes.clone();
                            fields.insert("id".to_string(), Value::String(entry.id.clone()));
                            Value::Object(fields.into_iter().collect())
                        })
                        .collect()
                })
                .unwrap_or_default();
            rendered
                .attributes
                .insert(embed.embed_attr.clone(), Value::Array(entries));
        }
        rendered
    }

    fn check_failure(&mut self, kind: &str, op: Op) -> Result<()> {
        if let Some(factory) = self.failures.get(&(kind.to_string(), op)) {
            return Err(factory());
        }
        Ok(())
    }
}

/// In-memory [`RemoteApi`] implementation.
///
/// All scripting is keyed by kind. The lifecycle status attribute the
/// scripts drive is always named `status`.
#[derive(Default)]
pub struct FakePlatform {
    inner: Mutex<Inner>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Created objects of `kind` report `ready` as their status
    /// immediately.
    pub fn script_status(&self, kind: &str, ready: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.status_scripts.insert(
            kind.to_string(),
            StatusScript {
                ready: ready.to_string(),
                pending: None,
            },
        );
    }

    /// Created objects of `kind` report `pending` for the next `reads`
    /// identity reads, then flip to `ready`.
    pub fn script_status_after(&self, kind: &str, pending: &str, ready: &str, reads: u32) {
        let mut inner = self.inner.lock().unwrap();
        inner.status_scripts.insert(
            kind.to_string(),
            StatusScript {
                ready: ready.to_string(),
                pending: Some((pending.to_string(), reads)),
            },
        );
    }

    /// Deleted objects of `kind` stay visible for `reads` identity reads
    /// before vanishing. Without this script deletes are synchronous and
    /// the first post-delete read already misses.
    pub fn script_delete_after(&self, kind: &str, reads: u32) {
        let mut inner = self.inner.lock().unwrap();
        inner.delete_scripts.insert(kind.to_string(), reads);
    }

    /// Serve `embed_attr` on `parent_kind` objects as the live array of
    /// `related_kind` entries referencing the parent through
    /// `parent_attr`.
    pub fn embed_related(
        &self,
        parent_kind: &str,
        related_kind: &str,
        parent_attr: &str,
        embed_attr: &str,
    ) {
        let mut inner = self.inner.lock().unwrap();
        inner.embeds.push(Embed {
            parent_kind: parent_kind.to_string(),
            related_kind: related_kind.to_string(),
            parent_attr: parent_attr.to_string(),
            embed_attr: embed_attr.to_string(),
        });
    }

    /// Creating a `parent_kind` object also creates one `related_kind`
    /// object per template, linked through `parent_attr`. This is how
    /// platforms seed default sub-resources.
    pub fn seed_on_create(
        &self,
        parent_kind: &str,
        related_kind: &str,
        parent_attr: &str,
        templates: Vec<AttrMap>,
    ) {
        let mut inner = self.inner.lock().unwrap();
        inner.seeds.push(Seed {
            parent_kind: parent_kind.to_string(),
            related_kind: related_kind.to_string(),
            parent_attr: parent_attr.to_string(),
            templates,
        });
    }

    /// Fail every `op` call against `kind` with the produced error until
    /// [`FakePlatform::clear_failures`] is called.
    pub fn fail(&self, kind: &str, op: Op, factory: impl Fn() -> CloudError + Send + Sync + 'static) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .failures
            .insert((kind.to_string(), op), Box::new(factory));
    }

    pub fn clear_failures(&self) {
        self.inner.lock().unwrap().failures.clear();
    }

    /// Seed an object directly, bypassing create scripting.
    pub fn insert(&self, kind: &str, object: RemoteObject) {
        self.inner.lock().unwrap().insert_object(kind, object);
    }

    /// Read a stored object as the API would serve it.
    pub fn stored(&self, kind: &str, id: &str) -> Option<RemoteObject> {
        let inner = self.inner.lock().unwrap();
        inner
            .objects
            .get(kind)
            .and_then(|store| store.get(id))
            .map(|object| inner.render(kind, object))
    }

    pub fn counters(&self) -> CallCounters {
        self.inner.lock().unwrap().counters
    }

    /// Recorded partial updates in call order.
    pub fn updates(&self) -> Vec<UpdateRecord> {
        self.inner.lock().unwrap().updates.clone()
    }
}

#[async_trait]
impl RemoteApi for FakePlatform {
    async fn list(&self, kind: &str, filter: &Filter) -> Result<Vec<RemoteObject>> {
        let mut inner = self.inner.lock().unwrap();
        inner.check_failure(kind, Op::List)?;
        inner.counters.lists += 1;

        let matches = inner
            .objects
            .get(kind)
            .map(|store| {
                store
                    .values()
                    .map(|object| inner.render(kind, object))
                    .filter(|object| object.matches(filter))
                    .collect()
            })
            .unwrap_or_default();
        Ok(matches)
    }

    async fn get(&self, kind: &str, id: &str) -> Result<RemoteObject> {
        let mut inner = self.inner.lock().unwrap();
        inner.check_failure(kind, Op::Get)?;
        inner.counters.gets += 1;

        let key = (kind.to_string(), id.to_string());

        // Scripted deletion latency: serve the object a few more times.
        match inner.pending_deletes.get(&key).copied() {
            Some(remaining) if remaining > 0 => {
                inner.pending_deletes.insert(key.clone(), remaining - 1);
            }
            Some(_) => {
                inner.pending_deletes.remove(&key);
                if let Some(store) = inner.objects.get_mut(kind) {
                    store.remove(id);
                }
                return Err(CloudError::not_found(kind, id));
            }
            None => {}
        }

        // Scripted provisioning latency: flip status once drained.
        match inner.pending_creates.get(&key).copied() {
            Some(remaining) if remaining > 0 => {
                inner.pending_creates.insert(key.clone(), remaining - 1);
            }
            Some(_) => {
                inner.pending_creates.remove(&key);
                let ready = inner
                    .status_scripts
                    .get(kind)
                    .map(|script| script.ready.clone());
                if let Some(ready) = ready {
                    if let Some(object) = inner
                        .objects
                        .get_mut(kind)
                        .and_then(|store| store.get_mut(id))
                    {
                        object
                            .attributes
                            .insert("status".to_string(), Value::String(ready));
                    }
                }
            }
            None => {}
        }

        let object = inner
            .objects
            .get(kind)
            .and_then(|store| store.get(id))
            .cloned()
            .ok_or_else(|| CloudError::not_found(kind, id))?;
        Ok(inner.render(kind, &object))
    }

    async fn create(&self, kind: &str, attrs: &AttrMap) -> Result<String> {
        let mut inner = self.inner.lock().unwrap();
        inner.check_failure(kind, Op::Create)?;
        inner.counters.creates += 1;

        let id = inner.allocate_id(kind);
        let mut object = RemoteObject::new(&id);
        object.attributes = attrs.clone();

        if let Some(script) = inner.status_scripts.get(kind).cloned() {
            match script.pending {
                Some((pending, reads)) => {
                    object
                        .attributes
                        .insert("status".to_string(), Value::String(pending));
                    inner
                        .pending_creates
                        .insert((kind.to_string(), id.clone()), reads);
                }
                None => {
                    object
                        .attributes
                        .insert("status".to_string(), Value::String(script.ready));
                }
            }
        }
        inner.insert_object(kind, object);

        // Seed default sub-resources.
        let mut seeded: Vec<(String, RemoteObject)> = Vec::new();
        for seed in inner.seeds.iter().filter(|seed| seed.parent_kind == kind) {
            for template in &seed.templates {
                let mut entry = RemoteObject::new(String::new());
                entry.attributes = template.clone();
                entry
                    .attributes
                    .insert(seed.parent_attr.clone(), Value::String(id.clone()));
                seeded.push((seed.related_kind.clone(), entry));
            }
        }
        for (related_kind, mut entry) in seeded {
            entry.id = inner.allocate_id(&related_kind);
            inner.insert_object(&related_kind, entry);
        }

        Ok(id)
    }

    async fn update(&self, kind: &str, id: &str, patch: &AttrMap) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.check_failure(kind, Op::Update)?;
        inner.counters.updates += 1;

        let object = inner
            .objects
            .get_mut(kind)
            .and_then(|store| store.get_mut(id))
            .ok_or_else(|| CloudError::not_found(kind, id))?;
        for (field, value) in patch {
            object.attributes.insert(field.clone(), value.clone());
        }

        inner.updates.push(UpdateRecord {
            kind: kind.to_string(),
            id: id.to_string(),
            patch: patch.clone(),
        });
        Ok(())
    }

    async fn delete(&self, kind: &str, id: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.check_failure(kind, Op::Delete)?;
        inner.counters.deletes += 1;

        let exists = inner
            .objects
            .get(kind)
            .is_some_and(|store| store.contains_key(id));
        if !exists {
            return Err(CloudError::not_found(kind, id));
        }

        match inner.delete_scripts.get(kind).copied() {
            Some(reads) => {
                inner
                    .pending_deletes
                    .insert((kind.to_string(), id.to_string()), reads);
            }
            None => {
                if let Some(store) = inner.objects.get_mut(kind) {
                    store.remove(id);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(pairs: &[(&str, Value)]) -> AttrMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn create_get_update_delete_round_trip() {
        let platform = FakePlatform::new();

        let id = platform
            .create("server", &attrs(&[("name", json!("web-1"))]))
            .await
            .unwrap();
        let object = platform.get("server", &id).await.unwrap();
        assert_eq!(object.attr_str("name"), Some("web-1"));

        platform
            .update("server", &id, &attrs(&[("name", json!("web-2"))]))
            .await
            .unwrap();
        assert_eq!(
            platform
                .get("server", &id)
                .await
                .unwrap()
                .attr_str("name"),
            Some("web-2")
        );

        platform.delete("server", &id).await.unwrap();
        let missing = platform.get("server", &id).await.unwrap_err();
        assert!(missing.is_not_found());
    }

    #[tokio::test]
    async fn scripted_provisioning_flips_after_reads() {
        let platform = FakePlatform::new();
        platform.script_status_after("backup", "creating", "available", 2);

        let id = platform.create("backup", &AttrMap::new()).await.unwrap();

        for _ in 0..2 {
            let object = platform.get("backup", &id).await.unwrap();
            assert_eq!(object.attr_str("status"), Some("creating"));
        }
        let object = platform.get("backup", &id).await.unwrap();
        assert_eq!(object.attr_str("status"), Some("available"));
    }

    #[tokio::test]
    async fn scripted_deletion_keeps_object_visible() {
        let platform = FakePlatform::new();
        platform.script_delete_after("server", 1);

        let id = platform.create("server", &AttrMap::new()).await.unwrap();
        platform.delete("server", &id).await.unwrap();

        assert!(platform.get("server", &id).await.is_ok());
        assert!(platform.get("server", &id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn embeds_track_related_objects() {
        let platform = FakePlatform::new();
        platform.embed_related("group", "rule", "group_id", "rules");
        platform.seed_on_create(
            "group",
            "rule",
            "group_id",
            vec![
                attrs(&[("direction", json!("egress"))]),
                attrs(&[("direction", json!("ingress"))]),
            ],
        );

        let id = platform.create("group", &AttrMap::new()).await.unwrap();
        let object = platform.get("group", &id).await.unwrap();
        assert_eq!(object.attr_array("rules").unwrap().len(), 2);

        let rules = platform.list("rule", &Filter::new()).await.unwrap();
        platform.delete("rule", &rules[0].id).await.unwrap();
        let object = platform.stored("group", &id).unwrap();
        assert_eq!(object.attr_array("rules").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn scripted_failures_surface_until_cleared() {
        let platform = FakePlatform::new();
        platform.fail("share", Op::List, || {
            CloudError::Transport("connection reset".to_string())
        });

        let err = platform.list("share", &Filter::new()).await.unwrap_err();
        assert!(matches!(err, CloudError::Transport(_)));

        platform.clear_failures();
        assert!(platform.list("share", &Filter::new()).await.is_ok());
    }
}

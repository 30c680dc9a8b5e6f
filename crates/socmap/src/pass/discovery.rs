//! Register discovery and bank synthesis.
//!
//! Walks the component tree depth first and binds every register field to exactly one bank:
//! 1. **Gather:** Declared fields, then structurally driven fields, deduplicated by identity.
//! 2. **Bind:** A field seen for the first time joins this node's new bank; a field already
//!    bound elsewhere becomes an alias here.
//! 3. **Synthesize:** New fields get one bank, inlined into the node's map and injected as an
//!    ignored child.
//!
//! Peripherals are opaque: only their driver methods are recorded.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use super::context::{BuildContext, Instance, InstanceChild};
use crate::common::constants::BANK_NAME;
use crate::common::error::Result;
use crate::csr::{FieldId, RegisterBank, RegisterField};
use crate::design::{ChildMode, NodeId};
use crate::map::{MemoryMap, join_path};

/// Builds the instance tree and the register banks.
pub fn discover(ctx: &mut BuildContext<'_>) -> Result<()> {
    let top = ctx.root;
    let root = visit(ctx, top, String::new())?;

    let design = ctx.design;
    for (id, field) in design.fields() {
        if !ctx.registry.contains(id) {
            warn!(
                field = %field.name(),
                id = id.0,
                "register field is not reachable from the top component and gets no address"
            );
        }
    }

    info!(
        instances = root.walk().len(),
        banks = ctx.banks.len(),
        fields = ctx.registry.len(),
        "discovered registers"
    );
    ctx.instances = Some(root);
    Ok(())
}

fn visit(ctx: &mut BuildContext<'_>, id: NodeId, path: String) -> Result<Instance> {
    let design = ctx.design;
    let node = design.node_checked(id)?;
    let mut local = MemoryMap::new();

    if node.peripheral().is_some() {
        for method in node.methods() {
            local.add_driver_method(method.clone())?;
        }
        return Ok(Instance {
            node: Some(id),
            path,
            local,
            peripheral: true,
            bank: None,
            children: Vec::new(),
        });
    }

    let mut seen = HashSet::new();
    let mut new_fields: Vec<(&str, FieldId, &RegisterField)> = Vec::new();
    let mut aliases = Vec::new();
    for (name, field) in node.fields().iter().chain(node.driven()) {
        if !seen.insert(*field) {
            continue;
        }
        let declared = design.field_checked(*field)?;
        declared.validate()?;
        if ctx.registry.bind(*field) {
            new_fields.push((name.as_str(), *field, declared));
        } else {
            aliases.push((name.as_str(), *field));
        }
    }

    let mut children = Vec::with_capacity(node.children().len() + 1);
    let mut bank = None;
    if !new_fields.is_empty() {
        let bank_path = join_path(&path, BANK_NAME);
        let synthesized = RegisterBank::synthesize(bank_path.clone(), &new_fields)?;
        let _ = local.allocate_subrange(synthesized.map().clone(), None)?;
        ctx.banks.push(synthesized);
        bank = Some(ctx.banks.len() - 1);
        children.push(InstanceChild {
            name: BANK_NAME.to_owned(),
            mode: ChildMode::Ignore,
            instance: Instance {
                node: None,
                path: bank_path,
                local: MemoryMap::new(),
                peripheral: false,
                bank,
                children: Vec::new(),
            },
        });
    }
    for (name, field) in aliases {
        debug!(path = %path, register = name, field = field.0, "aliasing register bound elsewhere");
        local.add_alias(name, field)?;
    }
    for method in node.methods() {
        local.add_driver_method(method.clone())?;
    }

    for link in node.children() {
        let instance = visit(ctx, link.node, join_path(&path, &link.name))?;
        children.push(InstanceChild {
            name: link.name.clone(),
            mode: link.mode,
            instance,
        });
    }

    Ok(Instance {
        node: Some(id),
        path,
        local,
        peripheral: false,
        bank,
        children,
    })
}

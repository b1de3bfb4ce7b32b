use std::collections::HashMap;

use anyhow::Context;
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde_json::json;

use reach_graph::{make_persistent, AdapterId, PersistReport};
use reach_oid::{
    AggregatedOid, CollectionOid, Equivalence, Oid, OidMarshaller, ParentOid, RootOid, Version,
};
use reach_store::{InMemoryStore, StoreConfig};

use crate::cli::*;
use crate::plan::GraphFile;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Decode(args) => cmd_decode(args, format),
        Command::Encode(args) => cmd_encode(args, format),
        Command::Compare(args) => cmd_compare(args, format),
        Command::Plan(args) => cmd_plan(args, format),
    }
}

fn cmd_decode(args: DecodeArgs, format: OutputFormat) -> anyhow::Result<()> {
    let oid = match args.kind {
        Some(kind) => OidMarshaller::unmarshal(&args.oid, kind.into())?,
        None => OidMarshaller::unmarshal_any(&args.oid)?,
    };

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&describe(&oid))?);
        return Ok(());
    }

    println!("{} {}", oid.kind().to_string().cyan().bold(), oid.to_string().bold());
    match &oid {
        Oid::Root(root) => print_root(root, ""),
        Oid::Aggregated(agg) => {
            println!("  Type: {}", agg.object_type().yellow());
            println!("  Local id: {}", agg.local_id());
            println!("  Depth: {}", agg.depth());
            print_parent(agg.parent());
        }
        Oid::Collection(coll) => {
            println!("  Collection: {}", coll.collection_id().yellow());
            print_parent(coll.parent());
        }
    }
    Ok(())
}

fn print_parent(parent: &ParentOid) {
    println!("  Parent: {}", parent.clone().into_oid());
    print_root(parent.root(), "  ");
}

fn print_root(root: &RootOid, indent: &str) {
    println!("{indent}  Root: {}:{}", root.object_type().yellow(), root.identifier());
    let state = if root.is_transient() {
        "transient".red()
    } else {
        "persistent".green()
    };
    println!("{indent}  State: {state}");
    if let Some(version) = root.version() {
        println!("{indent}  Version: {}", format_version(version));
    }
}

fn format_version(version: &Version) -> String {
    let mut text = format!("#{}", version.sequence);
    if let Some(user) = &version.user {
        text.push_str(&format!(" by {user}"));
    }
    if let Some(at) = version.utc_timestamp.and_then(DateTime::<Utc>::from_timestamp_millis) {
        text.push_str(&format!(" at {}", at.to_rfc3339()));
    }
    text
}

fn describe(oid: &Oid) -> serde_json::Value {
    let root = oid.root();
    let mut value = json!({
        "oid": oid.to_string(),
        "kind": oid.kind(),
        "type": oid.object_type(),
        "state": root.state(),
        "root": OidMarshaller::marshal_root(root),
        "version": root.version(),
    });
    match oid {
        Oid::Root(root) => value["identifier"] = json!(root.identifier()),
        Oid::Aggregated(agg) => {
            value["local_id"] = json!(agg.local_id());
            value["parent"] = json!(agg.parent().clone().into_oid());
        }
        Oid::Collection(coll) => {
            value["collection_id"] = json!(coll.collection_id());
            value["parent"] = json!(coll.parent().clone().into_oid());
        }
    }
    value
}

fn cmd_encode(args: EncodeArgs, format: OutputFormat) -> anyhow::Result<()> {
    let oid = build_oid(&args)?;
    let encoded = oid.to_string();
    if format == OutputFormat::Json {
        println!("{}", json!({ "oid": encoded, "kind": oid.kind() }));
    } else {
        println!("{encoded}");
    }
    Ok(())
}

fn build_oid(args: &EncodeArgs) -> anyhow::Result<Oid> {
    let mut root = if args.transient {
        RootOid::transient(&args.object_type, &args.id)?
    } else {
        RootOid::persistent(&args.object_type, &args.id)?
    };
    if let Some(sequence) = args.sequence {
        root = root.with_version(Version::new(sequence, args.user.clone(), args.utc))?;
    }

    let mut parent = ParentOid::from(root);
    for segment in &args.aggregates {
        let (object_type, local_id) = segment
            .split_once(':')
            .with_context(|| format!("aggregate {segment:?} must be TYPE:ID"))?;
        parent = AggregatedOid::new(object_type, parent, local_id)?.into();
    }

    Ok(match &args.collection {
        Some(collection) => CollectionOid::new(parent, collection)?.into(),
        None => parent.into_oid(),
    })
}

fn cmd_compare(args: CompareArgs, format: OutputFormat) -> anyhow::Result<()> {
    let left = OidMarshaller::unmarshal_any(&args.left)?;
    let right = OidMarshaller::unmarshal_any(&args.right)?;
    // Oid equality already ignores versions.
    let equivalence = if left == right {
        left.root().compare_against(right.root())
    } else {
        Equivalence::NotEquivalent
    };

    if format == OutputFormat::Json {
        println!("{}", json!({ "equivalence": equivalence }));
    } else if equivalence.is_equivalent() {
        println!("{} {}", "=".green().bold(), equivalence);
    } else {
        println!("{} {}", "≠".red().bold(), equivalence);
    }
    Ok(())
}

fn cmd_plan(args: PlanArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => StoreConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => StoreConfig::default(),
    };
    let built = GraphFile::load(&args.graph)?.build()?;
    let mut graph = built.graph;
    let mut store = InMemoryStore::new(config);

    let report = make_persistent(&mut graph, built.root, &mut store)?;
    let commands = store.pending().to_vec();
    let committed = if args.commit {
        store.commit()?
    } else {
        Vec::new()
    };

    if format == OutputFormat::Json {
        let out = json!({
            "commands": commands,
            "skipped": report.skipped,
            "committed": committed,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    print_report(&report, &built.names);
    for (n, command) in commands.iter().enumerate() {
        println!("{:>3}. {} {}", n + 1, "create".green(), command.oid.to_string().bold());
        for reference in &command.references {
            println!("       {} -> {}", reference.association.cyan(), reference.target);
        }
    }
    for oid in &committed {
        match oid.version() {
            Some(version) => println!("{} {} {}", "stored".green(), oid.without_version(), format_version(version)),
            None => println!("{} {}", "stored".green(), oid),
        }
    }
    Ok(())
}

fn print_report(report: &PersistReport, names: &HashMap<AdapterId, String>) {
    let allocated: Vec<&str> = report
        .allocated
        .iter()
        .map(|id| names.get(id).map(String::as_str).unwrap_or("?"))
        .collect();
    println!(
        "{} {} allocated ({}), {} skipped",
        "Plan:".bold(),
        report.allocated.len(),
        allocated.join(", "),
        report.skipped,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_args(object_type: &str, id: &str) -> EncodeArgs {
        EncodeArgs {
            object_type: object_type.into(),
            id: id.into(),
            transient: false,
            sequence: None,
            user: None,
            utc: None,
            aggregates: Vec::new(),
            collection: None,
        }
    }

    #[test]
    fn encode_versioned_root() {
        let args = EncodeArgs {
            sequence: Some(90809),
            user: Some("joebloggs".into()),
            utc: Some(1231),
            ..encode_args("CUS", "123")
        };
        assert_eq!(
            build_oid(&args).unwrap().to_string(),
            "CUS:123^90809:joebloggs:1231"
        );
    }

    #[test]
    fn encode_nested_collection() {
        let args = EncodeArgs {
            transient: true,
            aggregates: vec!["NME:2".into(), "PRT:a".into()],
            collection: Some("items".into()),
            ..encode_args("CUS", "123")
        };
        assert_eq!(
            build_oid(&args).unwrap().to_string(),
            "!CUS:123~NME:2~PRT:a$items"
        );
    }

    #[test]
    fn encode_rejects_bad_aggregate() {
        let args = EncodeArgs {
            aggregates: vec!["NME".into()],
            ..encode_args("CUS", "123")
        };
        assert!(build_oid(&args).is_err());
    }

    #[test]
    fn describe_collection() {
        let oid = OidMarshaller::unmarshal_any("CUS:1~NME:2$items").unwrap();
        let value = describe(&oid);
        assert_eq!(value["kind"], "collection");
        assert_eq!(value["collection_id"], "items");
        assert_eq!(value["parent"], "CUS:1~NME:2");
        assert_eq!(value["root"], "CUS:1");
        assert_eq!(value["state"], "persistent");
    }

    #[test]
    fn version_display_uses_rfc3339() {
        let version = Version::new(3, Some("joe".into()), Some(0));
        assert_eq!(format_version(&version), "#3 by joe at 1970-01-01T00:00:00+00:00");
    }
}

use crate::json_schema;

pub fn run(name: Option<String>, list: bool) -> anyhow::Result<()> {
    if list {
        for name in json_schema::schema_names() {
            println!("{}", name);
        }
        return Ok(());
    }

    let output = match name {
        Some(name) => {
            let schema = json_schema::get_schema(&name).ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown schema: {}. Available: {}",
                    name,
                    json_schema::schema_names().join(", ")
                )
            })?;
            serde_json::to_string_pretty(&schema)?
        }
        None => serde_json::to_string_pretty(&json_schema::all_schemas())?,
    };
    println!("{}", output);
    Ok(())
}

pub fn render_schema(vector_dim: u32) -> String {
	let init = include_str!("../sql/init.sql");
	let expanded = expand_includes(init);

	expanded.replace("<VECTOR_DIM>", &vector_dim.to_string())
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"00_extensions.sql" => out.push_str(include_str!("../sql/00_extensions.sql")),
				"tables/001_orgs.sql" => out.push_str(include_str!("../sql/tables/001_orgs.sql")),
				"tables/002_projects.sql" =>
					out.push_str(include_str!("../sql/tables/002_projects.sql")),
				"tables/003_sessions.sql" =>
					out.push_str(include_str!("../sql/tables/003_sessions.sql")),
				"tables/004_memory_entries.sql" =>
					out.push_str(include_str!("../sql/tables/004_memory_entries.sql")),
				"tables/005_entry_tags.sql" =>
					out.push_str(include_str!("../sql/tables/005_entry_tags.sql")),
				"tables/006_entry_relations.sql" =>
					out.push_str(include_str!("../sql/tables/006_entry_relations.sql")),
				"tables/007_entry_embeddings.sql" =>
					out.push_str(include_str!("../sql/tables/007_entry_embeddings.sql")),
				"tables/008_summaries.sql" =>
					out.push_str(include_str!("../sql/tables/008_summaries.sql")),
				"tables/009_summary_members.sql" =>
					out.push_str(include_str!("../sql/tables/009_summary_members.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}

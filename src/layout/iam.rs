use super::*;
use crate::config::Config;
use crate::graph::IdentityGraph;

/// Identity report: `policy`, `group`, `user` and `role` sheets. The policy
/// sheet is laid out first so its registry is complete before any sheet that
/// references it.
pub(super) fn compute_identity_report(graph: &IdentityGraph, _config: &Config) -> Document {
    let mut policy_anchors = Registry::new("policy");
    let policy_sheet = layout_policy_sheet(graph, &mut policy_anchors);

    let mut group_anchors = Registry::new("group");
    let group_sheet = layout_group_sheet(graph, &policy_anchors, &mut group_anchors);

    let user_sheet = layout_user_sheet(graph, &policy_anchors, &group_anchors);
    let role_sheet = layout_role_sheet(graph, &policy_anchors);

    Document {
        sheets: vec![policy_sheet, group_sheet, user_sheet, role_sheet],
    }
}

fn layout_policy_sheet(graph: &IdentityGraph, anchors: &mut Registry) -> SheetGrid {
    let mut sheet = SheetGrid::new("policy");
    for policy in &graph.policies {
        anchors.register(&policy.name, (sheet.row(), 0));
        sheet.begin_block();
        let row = sheet.row();
        sheet.put_text(row, 0, &policy.name, CellStyle::bordered(Borders::BOX));
        sheet.advance(1);
        let row = sheet.row();
        sheet.put_text(
            row,
            0,
            format_escaped_document(&policy.document),
            CellStyle::bordered(Borders::BOX),
        );
        sheet.advance(1);
        sheet.end_block();
        // blank separator row between policies
        sheet.advance(1);
    }
    sheet
}

fn layout_group_sheet(
    graph: &IdentityGraph,
    policies: &Registry,
    anchors: &mut Registry,
) -> SheetGrid {
    let mut sheet = SheetGrid::new("group");
    for group in &graph.groups {
        anchors.register(&group.name, (sheet.row(), 0));
        sheet.begin_block();
        let row = sheet.row();
        sheet.put_text(row, 0, &group.name, CellStyle::bordered(Borders::BOX));
        sheet.advance(1);
        for name in &group.policy_names {
            // dangling policy names render nothing
            let Some(link) = policies.resolve(name, name) else {
                continue;
            };
            let row = sheet.row();
            sheet.put_link(row, 0, link, CellStyle::bordered(Borders::SIDES));
            sheet.advance(1);
        }
        sheet.end_block();
        sheet.divider(&[0]);
    }
    sheet
}

fn layout_user_sheet(graph: &IdentityGraph, policies: &Registry, groups: &Registry) -> SheetGrid {
    let mut sheet = SheetGrid::new("user");
    for user in &graph.users {
        sheet.begin_block();
        let row = sheet.row();
        sheet.put_merged_text(row, 0, 1, &user.name, CellStyle::centered(Borders::BOX));
        sheet.advance(1);
        let row = sheet.row();
        sheet.put_text(row, 0, "Groups", CellStyle::centered(Borders::BOX));
        sheet.put_text(row, 1, "Policies", CellStyle::centered(Borders::BOX));
        sheet.advance(1);

        let base = sheet.row();
        let mut group_rows = 0;
        for name in &user.group_names {
            if let Some(link) = groups.resolve(name, name) {
                sheet.put_link(base + group_rows, 0, link, CellStyle::bordered(Borders::SIDES));
                group_rows += 1;
            }
        }
        let mut policy_rows = 0;
        for name in &user.policy_names {
            if let Some(link) = policies.resolve(name, name) {
                sheet.put_link(base + policy_rows, 1, link, CellStyle::bordered(Borders::SIDES));
                policy_rows += 1;
            }
        }
        let tall = group_rows.max(policy_rows);
        sheet.pad_columns(base, tall, &[(0, Borders::SIDES), (1, Borders::SIDES)]);
        sheet.advance(tall);
        sheet.end_block();
        sheet.divider(&[0, 1]);
    }
    sheet
}

fn layout_role_sheet(graph: &IdentityGraph, policies: &Registry) -> SheetGrid {
    let mut sheet = SheetGrid::new("role");
    for role in &graph.roles {
        sheet.begin_block();
        let row = sheet.row();
        sheet.put_merged_text(row, 0, 1, &role.name, CellStyle::centered(Borders::BOX));
        sheet.advance(1);
        let row = sheet.row();
        sheet.put_text(row, 0, "Assume Entity", CellStyle::centered(Borders::BOX));
        sheet.put_text(row, 1, "Policies", CellStyle::centered(Borders::BOX));
        sheet.advance(1);

        let base = sheet.row();
        sheet.put_text(
            base,
            0,
            format_escaped_document(&role.assume_document),
            CellStyle::centered(Borders::BOX),
        );
        let mut policy_rows = 0;
        for name in &role.policy_names {
            if let Some(link) = policies.resolve(name, name) {
                sheet.put_link(base + policy_rows, 1, link, CellStyle::bordered(Borders::SIDES));
                policy_rows += 1;
            }
        }
        // the assume document always occupies one row of the block
        let tall = policy_rows.max(1);
        sheet.pad_columns(base, tall, &[(0, Borders::SIDES), (1, Borders::SIDES)]);
        sheet.advance(tall);
        sheet.end_block();
        sheet.divider(&[0, 1]);
    }
    sheet
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Group, Policy, Role, User};

    fn graph() -> IdentityGraph {
        IdentityGraph {
            policies: vec![
                Policy {
                    name: "P1".to_string(),
                    document: "%7B%7D".to_string(),
                },
                Policy {
                    name: "P2".to_string(),
                    document: String::new(),
                },
            ],
            groups: vec![Group {
                name: "admins".to_string(),
                policy_names: vec![
                    "P1".to_string(),
                    "P2".to_string(),
                    "P3-missing".to_string(),
                ],
            }],
            users: vec![User {
                name: "alice".to_string(),
                policy_names: vec!["P1".to_string()],
                group_names: vec!["admins".to_string(), "nosuch".to_string()],
            }],
            roles: vec![Role {
                name: "deployer".to_string(),
                policy_names: Vec::new(),
                assume_document: "%7B%7D".to_string(),
            }],
        }
    }

    #[test]
    fn group_block_drops_dangling_policy_names() {
        let report = compute_identity_report(&graph(), &Config::default());
        let sheet = report.sheet("group").expect("group sheet");
        // header + two resolved links + divider
        assert_eq!(
            sheet.cell(0, 0).map(|c| c.content.label()),
            Some("admins")
        );
        for (row, label) in [(1, "P1"), (2, "P2")] {
            let cell = sheet.cell(row, 0).expect("link row");
            match &cell.content {
                CellContent::Link(link) => {
                    assert_eq!(link.label, label);
                    assert_eq!(link.sheet, "policy");
                }
                other => panic!("expected link, got {other:?}"),
            }
        }
        let divider = sheet.cell(3, 0).expect("divider");
        assert_eq!(divider.style.borders, Borders::TOP);
        assert_eq!(sheet.height(), 4);
    }

    #[test]
    fn group_links_point_at_policy_anchors() {
        let report = compute_identity_report(&graph(), &Config::default());
        let sheet = report.sheet("group").expect("group sheet");
        let Some(Cell {
            content: CellContent::Link(link),
            ..
        }) = sheet.cell(2, 0)
        else {
            panic!("expected link cell");
        };
        // P2 is the second policy: name row 3 (0: P1 name, 1: P1 doc, 2: blank)
        assert_eq!(link.coord, (3, 0));
    }

    #[test]
    fn user_block_advances_by_the_taller_sibling_list() {
        let report = compute_identity_report(&graph(), &Config::default());
        let sheet = report.sheet("user").expect("user sheet");
        // merged name header, Groups/Policies header, one row each side
        // (dangling group dropped), then the divider.
        assert_eq!(sheet.height(), 4);
        let pad = sheet.cell(2, 1).expect("policy link cell");
        assert_eq!(pad.style.borders, Borders::SIDES);
        assert_eq!(sheet.cell(3, 0).map(|c| c.style.borders), Some(Borders::TOP));
        assert_eq!(sheet.cell(3, 1).map(|c| c.style.borders), Some(Borders::TOP));
    }

    #[test]
    fn role_block_is_at_least_one_row_tall() {
        let report = compute_identity_report(&graph(), &Config::default());
        let sheet = report.sheet("role").expect("role sheet");
        // name, column headers, assume document row, divider
        assert_eq!(sheet.height(), 4);
        let doc_cell = sheet.cell(2, 0).expect("assume document");
        assert_eq!(doc_cell.content.label(), "{\n\n}");
        // the policy column is padded even though no policy resolved
        let pad = sheet.cell(2, 1).expect("padded cell");
        assert_eq!(pad.style.borders, Borders::SIDES);
    }
}

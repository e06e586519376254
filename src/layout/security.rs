use super::*;
use crate::config::Config;
use crate::graph::{Instance, NetworkInterface, SecurityGraph, SecurityGroup};

/// Security report: `instance`, `networkinterface` and `security-group`
/// sheets, built in that order so every sheet can link into the ones laid
/// out before it.
pub(super) fn compute_security_report(graph: &SecurityGraph, config: &Config) -> Document {
    // interfaces are shared across owning groups; lay each out exactly once
    let interfaces = dedup_by_key(graph.interfaces.iter().collect(), |ni: &&NetworkInterface| {
        ni.id.clone()
    });
    let instances = collect_instances(graph, &interfaces);

    let mut instance_anchors = Registry::new("instance");
    let instance_sheet = layout_instance_sheet(&instances, &mut instance_anchors);

    let mut interface_anchors = Registry::new("networkinterface");
    let interface_sheet =
        layout_interface_sheet(&interfaces, &instance_anchors, &mut interface_anchors);

    let group_sheet = layout_group_sheet(
        &graph.groups,
        &interfaces,
        &interface_anchors,
        config.layout.wrap_columns,
    );

    Document {
        sheets: vec![instance_sheet, interface_sheet, group_sheet],
    }
}

/// Instances reachable from the deduped interfaces, first occurrence wins.
fn collect_instances<'a>(
    graph: &'a SecurityGraph,
    interfaces: &[&NetworkInterface],
) -> Vec<&'a Instance> {
    let referenced: Vec<&Instance> = interfaces
        .iter()
        .filter_map(|ni| ni.instance_id.as_deref())
        .filter_map(|id| graph.instances.iter().find(|inst| inst.id == id))
        .collect();
    dedup_by_key(referenced, |inst: &&Instance| inst.id.clone())
}

fn layout_instance_sheet(instances: &[&Instance], anchors: &mut Registry) -> SheetGrid {
    let mut sheet = SheetGrid::new("instance");
    for instance in instances {
        anchors.register(&instance.id, (sheet.row(), 0));
        sheet.begin_block();
        let row = sheet.row();
        sheet.put_merged_text(
            row,
            0,
            1,
            format!("{}, tag: {}", instance.id, instance.tag_name),
            CellStyle::centered(Borders::BOX),
        );
        sheet.advance(1);
        let attrs = [
            ("AvailabilityZone", &instance.az),
            ("Private IP", &instance.private_ip),
            ("Public IP", &instance.public_ip),
            ("Instance Type", &instance.instance_type),
            ("Key Name", &instance.key_name),
        ];
        let last = attrs.len() - 1;
        for (pos, (label, value)) in attrs.into_iter().enumerate() {
            let borders = if pos == last {
                Borders::SIDES_BOTTOM
            } else {
                Borders::SIDES
            };
            let row = sheet.row();
            sheet.put_text(row, 0, label, CellStyle::bordered(borders));
            sheet.put_text(row, 1, value, CellStyle::bordered(borders));
            sheet.advance(1);
        }
        sheet.end_block();
        // blank separator row
        sheet.advance(1);
    }
    sheet
}

fn layout_interface_sheet(
    interfaces: &[&NetworkInterface],
    instances: &Registry,
    anchors: &mut Registry,
) -> SheetGrid {
    let mut sheet = SheetGrid::new("networkinterface");
    for interface in interfaces {
        anchors.register(&interface.id, (sheet.row(), 0));
        sheet.begin_block();
        let row = sheet.row();
        sheet.put_merged_text(row, 0, 1, &interface.id, CellStyle::centered(Borders::BOX));
        sheet.advance(1);
        let row = sheet.row();
        sheet.put_text(row, 0, "Description", CellStyle::bordered(Borders::SIDES));
        sheet.put_text(row, 1, &interface.description, CellStyle::bordered(Borders::SIDES));
        sheet.advance(1);
        if let Some(instance_id) = interface.instance_id.as_deref() {
            let row = sheet.row();
            sheet.put_text(row, 0, "Instance", CellStyle::bordered(Borders::SIDES));
            if let Some(link) = instances.resolve(instance_id, instance_id) {
                sheet.put_link(row, 1, link, CellStyle::bordered(Borders::SIDES));
            } else {
                sheet.put_blank(row, 1, CellStyle::bordered(Borders::SIDES));
            }
            sheet.advance(1);
        }
        sheet.end_block();
        sheet.divider(&[0, 1]);
    }
    sheet
}

fn layout_group_sheet(
    groups: &[SecurityGroup],
    interfaces: &[&NetworkInterface],
    anchors: &Registry,
    wrap_columns: usize,
) -> SheetGrid {
    let mut sheet = SheetGrid::new("security-group");
    let last_col = wrap_columns.saturating_sub(1) as u32;
    for group in groups {
        sheet.begin_block();
        let row = sheet.row();
        sheet.put_merged_text(
            row,
            0,
            5,
            format!("{} {}, tag: {}", group.id, group.group_name, group.tag_name),
            CellStyle::centered(Borders::BOX),
        );
        sheet.advance(1);
        let row = sheet.row();
        sheet.put_text(row, 0, "Description", CellStyle::bordered(Borders::BOX));
        sheet.put_merged_text(row, 1, 4, &group.description, CellStyle::bordered(Borders::BOX));
        sheet.advance(1);
        let row = sheet.row();
        sheet.put_merged_text(row, 0, 2, "Ingress Rules", CellStyle::centered(Borders::BOX));
        sheet.put_merged_text(row, 3, 2, "Egress Rules", CellStyle::centered(Borders::BOX));
        sheet.advance(1);
        let row = sheet.row();
        for col in [0, 3] {
            sheet.put_text(row, col, "Protocol", CellStyle::centered(Borders::BOX));
            sheet.put_text(row, col + 1, "Port", CellStyle::centered(Borders::BOX));
            sheet.put_text(row, col + 2, "Target", CellStyle::centered(Borders::BOX));
        }
        sheet.advance(1);

        let base = sheet.row();
        for (col, rules) in [(0, &group.ingress), (3, &group.egress)] {
            for (offset, rule) in rules.iter().enumerate() {
                let row = base + offset as u32;
                sheet.put_text(row, col, &rule.protocol, CellStyle::bordered(Borders::SIDES));
                sheet.put_text(row, col + 1, rule.port_label(), CellStyle::bordered(Borders::SIDES));
                sheet.put_text(row, col + 2, rule.target_label(), CellStyle::bordered(Borders::SIDES));
            }
        }
        let tall = group.ingress.len().max(group.egress.len()) as u32;
        let pads: Vec<(u32, Borders)> = (0..6).map(|col| (col, Borders::SIDES)).collect();
        sheet.pad_columns(base, tall, &pads);
        sheet.advance(tall);

        let row = sheet.row();
        sheet.put_merged_text(row, 0, 5, "Network Interface", CellStyle::centered(Borders::BOX));
        sheet.advance(1);

        let owned: Vec<&&NetworkInterface> = interfaces
            .iter()
            .filter(|ni| ni.owner_group_ids.iter().any(|id| id == &group.id))
            .collect();
        let base = sheet.row();
        for (index, interface) in owned.iter().enumerate() {
            let (grid_row, grid_col) = grid_slot(index, wrap_columns);
            let borders = if grid_col == 0 {
                Borders::LEFT
            } else if grid_col == last_col {
                Borders::RIGHT
            } else {
                Borders::NONE
            };
            if let Some(link) = anchors.resolve(&interface.id, &interface.id) {
                sheet.put_link(base + grid_row, grid_col, link, CellStyle::bordered(borders));
            } else {
                sheet.put_blank(base + grid_row, grid_col, CellStyle::bordered(borders));
            }
        }
        let grid_height = grid_rows(owned.len(), wrap_columns);
        sheet.pad_columns(base, grid_height, &[(0, Borders::LEFT), (last_col, Borders::RIGHT)]);
        sheet.advance(grid_height);
        sheet.end_block();
        sheet.divider(&[0, 1, 2, 3, 4, 5]);
    }
    sheet
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interface(id: &str, owners: &[&str], instance: Option<&str>) -> NetworkInterface {
        NetworkInterface {
            id: id.to_string(),
            description: format!("{id} primary"),
            instance_id: instance.map(str::to_string),
            owner_group_ids: owners.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn group(id: &str, ingress: usize, egress: usize) -> SecurityGroup {
        let rule = |port| crate::graph::IpPermission {
            protocol: "tcp".to_string(),
            from_port: port,
            to_port: port,
            cidr_ranges: vec!["0.0.0.0/0".to_string()],
            peer_group_ids: Vec::new(),
        };
        SecurityGroup {
            id: id.to_string(),
            group_name: format!("{id}-name"),
            tag_name: String::new(),
            description: "test group".to_string(),
            ingress: (0..ingress).map(|i| rule(80 + i as i64)).collect(),
            egress: (0..egress).map(|i| rule(443 + i as i64)).collect(),
        }
    }

    fn graph() -> SecurityGraph {
        SecurityGraph {
            groups: vec![group("sg-1", 2, 1), group("sg-2", 0, 0)],
            interfaces: vec![
                interface("eni-1", &["sg-1", "sg-2"], Some("i-1")),
                // duplicate fetch of the shared interface
                interface("eni-1", &["sg-1", "sg-2"], Some("i-1")),
                interface("eni-2", &["sg-2"], None),
            ],
            instances: vec![Instance {
                id: "i-1".to_string(),
                tag_name: "web".to_string(),
                az: "ap-northeast-1a".to_string(),
                private_ip: "10.0.1.5".to_string(),
                public_ip: "".to_string(),
                instance_type: "t3.micro".to_string(),
                key_name: "deploy".to_string(),
            }],
        }
    }

    fn find_links(sheet: &SheetGrid, label: &str) -> Vec<(Coord, LinkRef)> {
        sheet
            .cells()
            .filter_map(|(coord, cell)| match &cell.content {
                CellContent::Link(link) if link.label == label => {
                    Some((coord, link.clone()))
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn shared_interface_is_laid_out_once_and_referenced_twice() {
        let report = compute_security_report(&graph(), &Config::default());
        let interface_sheet = report.sheet("networkinterface").expect("interface sheet");
        // eni-1 header appears exactly once
        let headers: Vec<_> = interface_sheet
            .cells()
            .filter(|(_, cell)| cell.content.label() == "eni-1")
            .collect();
        assert_eq!(headers.len(), 1);

        let group_sheet = report.sheet("security-group").expect("group sheet");
        let links = find_links(group_sheet, "eni-1");
        assert_eq!(links.len(), 2);
        let targets: Vec<Coord> = links.iter().map(|(_, link)| link.coord).collect();
        assert_eq!(targets[0], targets[1]);
        assert!(links.iter().all(|(_, link)| link.sheet == "networkinterface"));
    }

    #[test]
    fn rule_block_pads_the_shorter_direction() {
        let report = compute_security_report(&graph(), &Config::default());
        let sheet = report.sheet("security-group").expect("group sheet");
        // sg-1: title row 0, description 1, direction headers 2, column
        // headers 3, rules 4..=5 (2 ingress vs 1 egress)
        assert_eq!(sheet.cell(5, 0).map(|c| c.content.label()), Some("tcp"));
        let pad = sheet.cell(5, 4).expect("padded egress cell");
        assert!(matches!(pad.content, CellContent::Blank));
        assert_eq!(pad.style.borders, Borders::SIDES);
    }

    #[test]
    fn interface_grid_wraps_at_the_configured_width() {
        let mut wide = graph();
        wide.interfaces = (0..8)
            .map(|i| interface(&format!("eni-{i}"), &["sg-1"], None))
            .collect();
        wide.groups = vec![group("sg-1", 0, 0)];
        let report = compute_security_report(&wide, &Config::default());
        let sheet = report.sheet("security-group").expect("group sheet");
        // no rules, so the banner lands on row 4; grid rows 5..=6, divider 7
        let first = find_links(sheet, "eni-0");
        let eighth = find_links(sheet, "eni-7");
        assert_eq!(first[0].0, (5, 0));
        assert_eq!(eighth[0].0, (6, 0));
        assert_eq!(sheet.cell(7, 0).map(|c| c.style.borders), Some(Borders::TOP));
    }

    #[test]
    fn exact_multiple_of_the_grid_width_adds_no_spare_row() {
        let mut wide = graph();
        wide.interfaces = (0..7)
            .map(|i| interface(&format!("eni-{i}"), &["sg-1"], None))
            .collect();
        wide.groups = vec![group("sg-1", 0, 0)];
        let report = compute_security_report(&wide, &Config::default());
        let sheet = report.sheet("security-group").expect("group sheet");
        // banner row 4, single grid row 5, divider row 6
        assert_eq!(sheet.cell(6, 0).map(|c| c.style.borders), Some(Borders::TOP));
        assert_eq!(sheet.height(), 7);
    }

    #[test]
    fn instance_sheet_links_back_from_interfaces() {
        let report = compute_security_report(&graph(), &Config::default());
        let instance_sheet = report.sheet("instance").expect("instance sheet");
        assert_eq!(
            instance_sheet.cell(0, 0).map(|c| c.content.label()),
            Some("i-1, tag: web")
        );
        let interface_sheet = report.sheet("networkinterface").expect("interface sheet");
        let links = find_links(interface_sheet, "i-1");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].1.coord, (0, 0));
        assert_eq!(links[0].1.sheet, "instance");
    }
}

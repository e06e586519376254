use super::*;
use crate::config::Config;
use crate::graph::{NetworkGraph, Subnet, Vpc};

/// Network report: one sheet per vpc. Call after
/// [`NetworkGraph::link_associations`] so subnet back-references are set.
pub(super) fn compute_network_report(graph: &NetworkGraph, _config: &Config) -> Document {
    Document {
        sheets: graph.vpcs.iter().map(layout_vpc_sheet).collect(),
    }
}

fn layout_vpc_sheet(vpc: &Vpc) -> SheetGrid {
    let name = if vpc.tag_name.is_empty() {
        &vpc.id
    } else {
        &vpc.tag_name
    };
    let mut sheet = SheetGrid::new(name);

    let row = sheet.row();
    sheet.put_merged_text(
        row,
        0,
        3,
        format!("{}  {}", vpc.tag_name, vpc.cidr_block),
        CellStyle::centered(Borders::BOX),
    );
    sheet.advance(1);

    for table in &vpc.route_tables {
        sheet.begin_block();
        let row = sheet.row();
        sheet.put_merged_text(
            row,
            0,
            1,
            format!("Route Table: {}", table.tag_name),
            CellStyle::centered(Borders::BOX),
        );
        sheet.put_merged_text(
            row,
            2,
            1,
            "Association Subnets",
            CellStyle::centered(Borders::BOX),
        );
        sheet.advance(1);

        let base = sheet.row();
        let mut route_rows = 0;
        for route in &table.routes {
            let row = base + route_rows;
            sheet.put_text(row, 0, &route.destination_cidr, CellStyle::bordered(Borders::LEFT));
            sheet.put_text(row, 1, &route.router_id, CellStyle::bordered(Borders::RIGHT));
            route_rows += 1;
        }
        let mut subnet_rows = 0;
        for subnet in associated_subnets(vpc, &table.id) {
            let row = base + subnet_rows;
            sheet.put_text(row, 2, &subnet.tag_name, CellStyle::bordered(Borders::LEFT));
            sheet.put_text(row, 3, &subnet.cidr_block, CellStyle::bordered(Borders::RIGHT));
            subnet_rows += 1;
        }
        let tall = route_rows.max(subnet_rows);
        sheet.pad_columns(base, tall, &[(0, Borders::LEFT), (3, Borders::RIGHT)]);
        sheet.advance(tall);
        sheet.end_block();
    }

    // closing border of the route-table column pair shares a row with the
    // unassociated-subnet banner
    let row = sheet.row();
    sheet.put_blank(row, 0, CellStyle::bordered(Borders::TOP));
    sheet.put_blank(row, 1, CellStyle::bordered(Borders::TOP));
    sheet.begin_block();
    sheet.put_merged_text(
        row,
        2,
        1,
        "No Association Subnets",
        CellStyle::centered(Borders::BOX),
    );
    sheet.advance(1);
    for subnet in vpc.subnets.iter().filter(|s| s.route_table_id.is_none()) {
        let row = sheet.row();
        sheet.put_text(row, 2, &subnet.tag_name, CellStyle::bordered(Borders::LEFT));
        sheet.put_text(row, 3, &subnet.cidr_block, CellStyle::bordered(Borders::RIGHT));
        sheet.advance(1);
    }
    sheet.end_block();
    sheet.divider(&[2, 3]);

    sheet
}

fn associated_subnets<'a>(vpc: &'a Vpc, table_id: &'a str) -> impl Iterator<Item = &'a Subnet> {
    vpc.subnets
        .iter()
        .filter(move |s| s.route_table_id.as_deref() == Some(table_id))
}

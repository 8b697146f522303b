use referral_shared::models::InvitationNode;
use referral_shared::stats::TreeStats;
use std::rc::Rc;

pub const EMPTY_PLACEHOLDER: &str = "No users found yet.";

/// Plain-text outline of the forest, headed by the title and statistics.
pub fn render_outline(title: &str, forest: &[InvitationNode], stats: &TreeStats) -> String {
    let mut out = String::new();
    push_line(&mut out, title);
    push_line(&mut out, &stats_line(stats));
    out.push('\n');

    if forest.is_empty() {
        push_line(&mut out, EMPTY_PLACEHOLDER);
        return out;
    }

    for root in forest {
        push_line(&mut out, &root.name);
        push_attributes(&mut out, root, "");
        push_descendants(&mut out, root);
    }
    out
}

pub fn stats_line(stats: &TreeStats) -> String {
    format!(
        "Members: {} total, {} direct, {} indirect",
        stats.total, stats.direct, stats.indirect
    )
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}

fn push_attributes(out: &mut String, node: &InvitationNode, prefix: &str) {
    for (key, value) in node.attributes() {
        push_line(out, &format!("{}  {}: {}", prefix, key, value));
    }
}

/// Pending entry of the depth-first walk: a node, the prefix of its
/// parent's column and whether it is its parent's last child.
struct Pending<'a> {
    node: &'a InvitationNode,
    prefix: Rc<str>,
    last: bool,
}

// Explicit stack so that arbitrarily deep chains render without recursion.
fn push_descendants(out: &mut String, root: &InvitationNode) {
    let mut stack = Vec::new();
    push_children(&mut stack, root, Rc::from(""));

    while let Some(Pending { node, prefix, last }) = stack.pop() {
        let (branch, continuation) = if last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };

        push_line(out, &format!("{}{}{}", prefix, branch, node.name));
        let child_prefix: Rc<str> = Rc::from(format!("{}{}", prefix, continuation));
        push_attributes(out, node, &child_prefix);
        push_children(&mut stack, node, child_prefix);
    }
}

// Children go on in reverse so the first child is popped first.
fn push_children<'a>(stack: &mut Vec<Pending<'a>>, node: &'a InvitationNode, prefix: Rc<str>) {
    let children = node.children();
    for (i, child) in children.iter().enumerate().rev() {
        stack.push(Pending {
            node: child,
            prefix: Rc::clone(&prefix),
            last: i + 1 == children.len(),
        });
    }
}

use crate::source::ContentEntry;
use colored::Colorize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

/// Represents a node in the tree (either file or directory).
#[derive(Debug)]
struct TreeNode {
    name: String,
    children: Vec<Rc<RefCell<TreeNode>>>,
    /// `Some` for files, holding the role the file ends up with.
    role: Option<String>,
}
impl TreeNode {
    fn new(name: String, role: Option<String>) -> Self {
        Self {
            name,
            children: Vec::new(),
            role,
        }
    }
}

/// Build the directory tree from the content entries, returning the root node.
///
/// Entries arrive directories-first, so pushing children in arrival order keeps the
/// manifest order.
fn build_tree(
    entries: &[ContentEntry],
    source_directory: &Path,
    default_role: &str,
) -> Rc<RefCell<TreeNode>> {
    // create a root node to represent the source directory
    let root_name = source_directory
        .file_name()
        .map(|os| os.to_string_lossy().to_string())
        .unwrap_or_else(|| source_directory.display().to_string());

    let root = Rc::new(RefCell::new(TreeNode::new(root_name, None)));

    // map manifest directory path to node, "" is the root
    let mut lookup: HashMap<String, Rc<RefCell<TreeNode>>> = HashMap::new();
    lookup.insert(String::new(), Rc::clone(&root));

    for entry in entries {
        let segments: Vec<&str> = entry.path.split('/').collect();
        let Some((file_name, directories)) = segments.split_last() else {
            continue;
        };

        let mut parent = Rc::clone(&root);
        let mut prefix = String::new();

        // make sure every directory on the way exists
        for directory in directories {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(directory);

            let node = match lookup.get(&prefix) {
                Some(node) => Rc::clone(node),
                None => {
                    let node = Rc::new(RefCell::new(TreeNode::new(directory.to_string(), None)));
                    parent.borrow_mut().children.push(Rc::clone(&node));
                    lookup.insert(prefix.clone(), Rc::clone(&node));
                    node
                }
            };

            parent = node;
        }

        let role = entry.role.as_deref().unwrap_or(default_role).to_string();
        let file = Rc::new(RefCell::new(TreeNode::new(file_name.to_string(), Some(role))));

        parent.borrow_mut().children.push(file);
    }

    root
}

/// Print the tree with a nice ASCII style.
fn print_tree(node: &Rc<RefCell<TreeNode>>, prefix: &str, is_last: bool) {
    let node_borrow = node.borrow();

    let connector = if is_last {
        "└── ".yellow()
    } else {
        "├── ".yellow()
    };
    match &node_borrow.role {
        Some(role) => println!(
            "{}{}{} {}",
            prefix.yellow(),
            connector,
            node_borrow.name.green(),
            format!("[{}]", role).dimmed()
        ),
        None => println!("{}{}{}", prefix.yellow(), connector, node_borrow.name.blue()),
    }

    let child_prefix = if is_last {
        format!("{}    ", prefix)
    } else {
        format!("{}│   ", prefix)
    };

    let len = node_borrow.children.len();
    for (i, child) in node_borrow.children.iter().enumerate() {
        let last = i == len - 1;
        print_tree(child, &child_prefix, last);
    }
}

/// Prints the entries as a tree rooted at the source directory, each file tagged with its role.
pub fn preview_as_tree(entries: &[ContentEntry], source_directory: &Path, default_role: &str) {
    let tree_root = build_tree(entries, source_directory, default_role);

    println!(
        "Legend: {} = (directory), {} = (file), {} = (role)",
        "blue".blue(),
        "green".green(),
        "[role]".dimmed()
    );

    let fancy_prompt = format!(
        "{} {}\n",
        "┌─".bold().bright_blue(),
        "Preview".bold().bright_blue(),
    );

    println!("{}", fancy_prompt);

    print_tree(&tree_root, "", true);

    let fancy_prompt = format!(
        "\n{} {}\n",
        "└─".bold().bright_blue(),
        format!("{} file(s), nothing written", entries.len()).bright_green()
    );

    println!("{}", fancy_prompt);
}

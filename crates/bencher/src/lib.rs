/// A request path to match, with the size of the route table it is matched against.
#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    group: TestGroup,
    path: &'static str,
}

impl TestCase {
    pub fn new(name: &'static str, group: TestGroup, path: &'static str) -> Self {
        Self { name, group, path }
    }

    pub fn small(name: &'static str, path: &'static str) -> Self {
        Self::new(name, TestGroup::Small, path)
    }

    pub fn large(name: &'static str, path: &'static str) -> Self {
        Self::new(name, TestGroup::Large, path)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    pub fn path(&self) -> &'static str {
        self.path
    }
}

#[derive(Clone, Copy, Debug)]
pub enum TestGroup {
    Small,
    Large,
}

impl TestGroup {
    /// Number of resource groups registered in the route table.
    pub fn resources(self) -> usize {
        match self {
            TestGroup::Small => 4,
            TestGroup::Large => 64,
        }
    }
}

/// The templates registered for one resource group: a collection, an item and a nested item.
pub fn templates(resource: usize) -> [String; 3] {
    [
        format!("/api/resource{resource}"),
        format!("/api/resource{resource}/{{id}}"),
        format!("/api/resource{resource}/{{id}}/items/{{item}}"),
    ]
}

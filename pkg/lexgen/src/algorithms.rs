/// Union-find over the elements 0..n.
///
/// Every set is identified by the smallest element it contains so that set
/// identities are independent of the order in which unions were performed.
pub struct DisjointSets {
    elements: Vec<Element>,
}

#[derive(Clone, Copy)]
struct Element {
    parent: usize,
    rank: usize,
    /// Smallest member of the set. Only valid on root elements.
    min: usize,
}

impl DisjointSets {
    /// Creates n singleton sets.
    pub fn new(n: usize) -> Self {
        let elements = (0..n)
            .map(|i| Element {
                parent: i,
                rank: 0,
                min: i,
            })
            .collect();

        Self { elements }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Finds the root element of the set containing x.
    pub fn find_set(&mut self, mut x: usize) -> usize {
        while self.elements[x].parent != x {
            // Path halving.
            let grandparent = self.elements[self.elements[x].parent].parent;
            self.elements[x].parent = grandparent;
            x = grandparent;
        }

        x
    }

    /// Like find_set, but returns the smallest element of the set.
    pub fn find_set_min(&mut self, x: usize) -> usize {
        let root = self.find_set(x);
        self.elements[root].min
    }

    /// Merges the sets containing x and y.
    pub fn union_sets(&mut self, x: usize, y: usize) {
        let x = self.find_set(x);
        let y = self.find_set(y);
        if x == y {
            return;
        }

        let min = self.elements[x].min.min(self.elements[y].min);

        let (root, child) = if self.elements[x].rank < self.elements[y].rank {
            (y, x)
        } else {
            (x, y)
        };

        if self.elements[root].rank == self.elements[child].rank {
            self.elements[root].rank += 1;
        }

        self.elements[child].parent = root;
        self.elements[root].min = min;
    }

    /// Groups all elements by set. Groups are ordered by their smallest
    /// element and the members of each group are in ascending order.
    pub fn groups(&mut self) -> Vec<Vec<usize>> {
        let mut group_of_min = vec![usize::MAX; self.len()];
        let mut groups: Vec<Vec<usize>> = vec![];

        for i in 0..self.len() {
            let min = self.find_set_min(i);
            if group_of_min[min] == usize::MAX {
                group_of_min[min] = groups.len();
                groups.push(vec![]);
            }

            groups[group_of_min[min]].push(i);
        }

        groups
    }
}

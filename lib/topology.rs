//! The connectivity graph of a circuit: which pairs of qubits share a
//! bond, and therefore which pairs the cursor can straddle.
//!
//! A [`CircuitTopology`] is an undirected graph over `num_bits` sites
//! whose edges ("links") each carry a unique id in `[0, num_links)`. The
//! wave function in [`circuit`][crate::circuit] requires the graph to be
//! a tree with maximum degree 3; the builders here only produce such
//! graphs, and [`CircuitTopology::is_tree`] lets consumers check graphs
//! assembled by hand.

use std::collections::VecDeque;

/// One entry in a site's adjacency list.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Neighbor {
    /// The opposite endpoint of the link.
    pub site: usize,
    /// The link's unique id.
    pub link: usize,
}

/// An undirected graph over qubit sites, with links identified by unique
/// ids.
///
/// Adjacency lists preserve the order in which links were generated, so
/// every traversal of a site's neighbors is stable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CircuitTopology {
    neighbors: Vec<Vec<Neighbor>>,
    num_links: usize,
}

impl CircuitTopology {
    /// Create a topology over `num_bits` sites with no links.
    pub fn new(num_bits: usize) -> Self {
        Self { neighbors: vec![Vec::new(); num_bits], num_links: 0 }
    }

    /// Add a link between two sites, assigning it the next free link id.
    ///
    /// # Panics
    /// Panics if either site is out of range, if the two sites coincide,
    /// or if the pair is already linked.
    pub fn generate_link(&mut self, site1: usize, site2: usize) {
        let n = self.num_bits();
        if site1 >= n || site2 >= n {
            panic!("generate_link: site out of range ({site1}, {site2})");
        }
        if site1 == site2 {
            panic!("generate_link: self-link on site {site1}");
        }
        if self.are_adjacent(site1, site2) {
            panic!(
                "generate_link: duplicate link between {site1} and {site2}");
        }
        let link = self.num_links;
        self.neighbors[site1].push(Neighbor { site: site2, link });
        self.neighbors[site2].push(Neighbor { site: site1, link });
        self.num_links += 1;
    }

    /// Return the number of sites.
    pub fn num_bits(&self) -> usize { self.neighbors.len() }

    /// Return the number of links.
    pub fn num_links(&self) -> usize { self.num_links }

    /// Return the neighbors of a site, in link-generation order.
    ///
    /// # Panics
    /// Panics if `site` is out of range.
    pub fn neighbors_of(&self, site: usize) -> &[Neighbor] {
        &self.neighbors[site]
    }

    /// Return the number of links incident on a site.
    pub fn degree(&self, site: usize) -> usize {
        self.neighbors[site].len()
    }

    /// Return `true` if the two sites share a link.
    pub fn are_adjacent(&self, site1: usize, site2: usize) -> bool {
        self.neighbors[site1].iter().any(|nb| nb.site == site2)
    }

    /// Return the id of the link between two sites, if there is one.
    pub fn link_between(&self, site1: usize, site2: usize) -> Option<usize> {
        self.neighbors[site1].iter()
            .find(|nb| nb.site == site2)
            .map(|nb| nb.link)
    }

    /// Return `true` if the graph is a tree: connected, with exactly one
    /// fewer link than sites.
    pub fn is_tree(&self) -> bool {
        let n = self.num_bits();
        n > 0
            && self.num_links == n - 1
            && self.bfs_order(0).len() == n
    }

    /// Return the sites reachable from `start` in breadth-first order.
    ///
    /// On a connected graph the result covers every site, and every site
    /// after the first is adjacent to one listed before it.
    pub fn bfs_order(&self, start: usize) -> Vec<usize> {
        let n = self.num_bits();
        let mut seen = vec![false; n];
        let mut order = Vec::with_capacity(n);
        let mut queue = VecDeque::new();
        seen[start] = true;
        queue.push_back(start);
        while let Some(site) = queue.pop_front() {
            order.push(site);
            for nb in self.neighbors[site].iter() {
                if !seen[nb.site] {
                    seen[nb.site] = true;
                    queue.push_back(nb.site);
                }
            }
        }
        order
    }

    /// Return the unique path between two sites of a tree, endpoints
    /// included.
    ///
    /// # Panics
    /// Panics if `to` is unreachable from `from`.
    pub fn path(&self, from: usize, to: usize) -> Vec<usize> {
        let n = self.num_bits();
        let mut parent = vec![usize::MAX; n];
        let mut seen = vec![false; n];
        let mut queue = VecDeque::new();
        seen[from] = true;
        queue.push_back(from);
        while let Some(site) = queue.pop_front() {
            if site == to { break; }
            for nb in self.neighbors[site].iter() {
                if !seen[nb.site] {
                    seen[nb.site] = true;
                    parent[nb.site] = site;
                    queue.push_back(nb.site);
                }
            }
        }
        if !seen[to] {
            panic!("path: site {to} is unreachable from {from}");
        }
        let mut path = vec![to];
        let mut site = to;
        while site != from {
            site = parent[site];
            path.push(site);
        }
        path.reverse();
        path
    }
}

/// An open chain of `size` sites: `0 - 1 - 2 - ⋯ - (size-1)`.
pub fn chain(size: usize) -> CircuitTopology {
    let mut topology = CircuitTopology::new(size);
    for i in 0..size.saturating_sub(1) {
        topology.generate_link(i, i + 1);
    }
    topology
}

/// A star of `size` sites: site 0 linked to every other site.
///
/// # Panics
/// Panics if `size > 4`, which would put site 0 above degree 3.
pub fn star(size: usize) -> CircuitTopology {
    if size > 4 {
        panic!("star: {size} sites would give the center degree {}", size - 1);
    }
    let mut topology = CircuitTopology::new(size);
    for i in 1..size {
        topology.generate_link(0, i);
    }
    topology
}

/// A topology over `num_bits` sites with the given links, in order.
pub fn from_links(num_bits: usize, links: &[(usize, usize)])
    -> CircuitTopology
{
    let mut topology = CircuitTopology::new(num_bits);
    for &(site1, site2) in links {
        topology.generate_link(site1, site2);
    }
    topology
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_counts() {
        let t = chain(4);
        assert_eq!(t.num_bits(), 4);
        assert_eq!(t.num_links(), 3);
        assert_eq!(t.degree(0), 1);
        assert_eq!(t.degree(1), 2);
        assert!(t.are_adjacent(1, 2));
        assert!(!t.are_adjacent(0, 2));
        assert!(t.is_tree());
    }

    #[test]
    fn star_counts() {
        let t = star(4);
        assert_eq!(t.num_links(), 3);
        assert_eq!(t.degree(0), 3);
        assert_eq!(t.degree(3), 1);
        assert!(t.is_tree());
    }

    #[test]
    #[should_panic]
    fn star_rejects_degree_above_three() { let _ = star(5); }

    #[test]
    #[should_panic]
    fn duplicate_links_are_rejected() {
        let _ = from_links(3, &[(0, 1), (1, 0)]);
    }

    #[test]
    fn link_ids_are_sequential_and_shared() {
        let t = from_links(4, &[(0, 1), (1, 2), (1, 3)]);
        assert_eq!(t.link_between(0, 1), Some(0));
        assert_eq!(t.link_between(2, 1), Some(1));
        assert_eq!(t.link_between(1, 3), Some(2));
        assert_eq!(t.link_between(0, 2), None);
        // both endpoints see the same link id
        assert_eq!(t.link_between(1, 0), Some(0));
    }

    #[test]
    fn cycles_are_not_trees() {
        let t = from_links(3, &[(0, 1), (1, 2), (2, 0)]);
        assert!(!t.is_tree());
        // disconnected
        let t = from_links(4, &[(0, 1), (2, 3)]);
        assert!(!t.is_tree());
    }

    #[test]
    fn bfs_order_starts_at_the_root_and_covers_the_tree() {
        let t = from_links(5, &[(0, 1), (0, 2), (2, 3), (2, 4)]);
        let order = t.bfs_order(0);
        assert_eq!(order.len(), 5);
        assert_eq!(order[0], 0);
        // every site after the first is adjacent to an earlier one
        for (k, &site) in order.iter().enumerate().skip(1) {
            assert!(order[..k].iter().any(|&prev| t.are_adjacent(prev, site)));
        }
    }

    #[test]
    fn path_walks_the_unique_route() {
        let t = from_links(5, &[(0, 1), (0, 2), (2, 3), (2, 4)]);
        assert_eq!(t.path(1, 4), vec![1, 0, 2, 4]);
        assert_eq!(t.path(3, 3), vec![3]);
        assert_eq!(t.path(4, 3), vec![4, 2, 3]);
    }
}

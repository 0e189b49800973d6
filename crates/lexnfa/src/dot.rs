//! Minimal Graphviz writer

use std::{
    borrow::Cow,
    collections::BTreeMap,
    fmt::{self, Display},
};

use indexmap::IndexMap;

macro_rules! attr {
    ($id:ident, $name:literal) => {
        pub fn $id<S: Into<Cow<'a, str>>>(&mut self, $id: S) -> &mut Self {
            self.attrs.insert($name, $id.into());
            self
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GraphType {
    Undirected,
    Directed,
}

impl GraphType {
    fn edge_op(self) -> &'static str {
        match self {
            Self::Undirected => "--",
            Self::Directed => "->",
        }
    }
}

impl Display for GraphType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Undirected => "graph",
            Self::Directed => "digraph",
        })
    }
}

#[derive(Debug)]
pub struct Graph<'a> {
    ty: GraphType,
    attrs: BTreeMap<&'static str, Cow<'a, str>>,
    nodes: IndexMap<Cow<'a, str>, Node<'a>>,
    edges: IndexMap<(Cow<'a, str>, Cow<'a, str>), Vec<Edge<'a>>>,
}

impl<'a> Graph<'a> {
    attr!(label, "label");

    #[must_use]
    pub fn new(ty: GraphType) -> Self {
        Self {
            ty,
            attrs: BTreeMap::new(),
            nodes: IndexMap::new(),
            edges: IndexMap::new(),
        }
    }

    #[inline]
    pub fn node<S: Into<Cow<'a, str>>>(&mut self, id: S) -> &mut Node<'a> {
        self.nodes.entry(id.into()).or_default()
    }

    #[inline]
    pub fn edge<L: Into<Cow<'a, str>>, R: Into<Cow<'a, str>>>(
        &mut self,
        l: L,
        r: R,
    ) -> &mut Edge<'a> {
        let l = l.into();
        let r = r.into();
        self.node(l.clone());
        self.node(r.clone());
        let edges = self.edges.entry((l, r)).or_default();
        edges.push(Edge::default());
        edges.last_mut().unwrap_or_else(|| unreachable!())
    }
}

fn write_attrs(f: &mut fmt::Formatter, attrs: &BTreeMap<&'static str, Cow<str>>) -> fmt::Result {
    for (i, (key, val)) in attrs.iter().enumerate() {
        f.write_str(if i == 0 { "[" } else { "," })?;
        write!(f, "{key}={val:?}")?;
    }

    if attrs.is_empty() {
        Ok(())
    } else {
        f.write_str("]")
    }
}

impl Display for Graph<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let Self {
            ty,
            attrs,
            nodes,
            edges,
        } = self;

        write!(f, "{ty} {{")?;

        for (key, val) in attrs {
            write!(f, "{key}={val:?};")?;
        }

        for (id, Node { attrs }) in nodes {
            write!(f, "{id:?}")?;
            write_attrs(f, attrs)?;
            f.write_str(";")?;
        }

        for ((l, r), edges) in edges {
            for Edge { attrs } in edges {
                write!(f, "{l:?}{}{r:?}", ty.edge_op())?;
                write_attrs(f, attrs)?;
                f.write_str(";")?;
            }
        }

        f.write_str("}")
    }
}

#[derive(Debug, Default)]
pub struct Node<'a> {
    attrs: BTreeMap<&'static str, Cow<'a, str>>,
}

impl<'a> Node<'a> {
    attr!(style, "style");

    attr!(shape, "shape");

    attr!(label, "label");

    attr!(border_count, "peripheries");
}

#[derive(Debug, Default)]
pub struct Edge<'a> {
    attrs: BTreeMap<&'static str, Cow<'a, str>>,
}

impl<'a> Edge<'a> {
    attr!(style, "style");

    attr!(label, "label");
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn render() {
        let mut graph = Graph::new(GraphType::Directed);
        graph.label("g");
        graph.node("a").shape("box").label("A");
        graph.edge("a", "b").style("dashed");
        graph.edge("a", "b");

        assert_eq!(
            graph.to_string(),
            r#"digraph {label="g";"a"[label="A",shape="box"];"b";"a"->"b"[style="dashed"];"a"->"b";}"#
        );
    }
}

//! Orden topológico y detección de ciclos sobre el grafo de dependencias.
//!
//! El grafo se describe como una lista `(nombre, upstreams)` en orden de
//! declaración. Las aristas que apuntan a nombres desconocidos se ignoran
//! (la validación de referencias ocurre antes, en la definición).

use std::collections::{BTreeSet, HashMap, HashSet};

/// Orden de Kahn con desempate por orden de declaración.
///
/// Devuelve índices sobre `nodes`, o los nombres que quedaron sin ordenar
/// si hay un ciclo.
pub fn topological_order(nodes: &[(String, Vec<String>)]) -> Result<Vec<usize>, Vec<String>> {
    let index: HashMap<&str, usize> = nodes.iter().enumerate().map(|(i, (n, _))| (n.as_str(), i)).collect();
    let mut in_degree = vec![0usize; nodes.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for (i, (_, deps)) in nodes.iter().enumerate() {
        let unique: BTreeSet<usize> = deps.iter().filter_map(|d| index.get(d.as_str()).copied()).collect();
        for d in unique {
            in_degree[i] += 1;
            dependents[d].push(i);
        }
    }

    let mut ready: BTreeSet<usize> = (0..nodes.len()).filter(|i| in_degree[*i] == 0).collect();
    let mut order = Vec::with_capacity(nodes.len());
    while let Some(next) = ready.pop_first() {
        order.push(next);
        for &child in &dependents[next] {
            in_degree[child] -= 1;
            if in_degree[child] == 0 {
                ready.insert(child);
            }
        }
    }

    if order.len() != nodes.len() {
        let placed: HashSet<usize> = order.iter().copied().collect();
        return Err(nodes.iter()
                        .enumerate()
                        .filter(|(i, _)| !placed.contains(i))
                        .map(|(_, (n, _))| n.clone())
                        .collect());
    }
    Ok(order)
}

/// Busca un ciclo con DFS y devuelve el camino cerrado (`a -> b -> a`).
pub fn find_cycle(nodes: &[(String, Vec<String>)]) -> Option<Vec<String>> {
    let graph: HashMap<&str, &Vec<String>> = nodes.iter().map(|(n, deps)| (n.as_str(), deps)).collect();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut stack: Vec<&str> = Vec::new();

    fn dfs<'a>(node: &'a str,
               graph: &HashMap<&'a str, &'a Vec<String>>,
               visited: &mut HashSet<&'a str>,
               stack: &mut Vec<&'a str>)
               -> Option<Vec<String>> {
        if let Some(pos) = stack.iter().position(|n| *n == node) {
            let mut cycle: Vec<String> = stack[pos..].iter().map(|s| s.to_string()).collect();
            cycle.push(node.to_string());
            return Some(cycle);
        }
        if !visited.insert(node) {
            return None;
        }
        stack.push(node);
        if let Some(deps) = graph.get(node) {
            for dep in deps.iter() {
                if graph.contains_key(dep.as_str()) {
                    if let Some(c) = dfs(dep.as_str(), graph, visited, stack) {
                        return Some(c);
                    }
                }
            }
        }
        stack.pop();
        None
    }

    for (name, _) in nodes {
        if let Some(mut cycle) = dfs(name.as_str(), &graph, &mut visited, &mut stack) {
            // el DFS recorre aristas hacia upstream; lo presentamos en sentido del flujo
            cycle.reverse();
            return Some(cycle);
        }
    }
    None
}

/// Agrupa el orden topológico en niveles: cada nodo queda un nivel por debajo
/// de su upstream más profundo. Nodos de un mismo nivel son independientes.
pub fn dependency_levels(nodes: &[(String, Vec<String>)], order: &[usize]) -> Vec<Vec<usize>> {
    let index: HashMap<&str, usize> = nodes.iter().enumerate().map(|(i, (n, _))| (n.as_str(), i)).collect();
    let mut level = vec![0usize; nodes.len()];
    for &i in order {
        level[i] = nodes[i].1
                           .iter()
                           .filter_map(|d| index.get(d.as_str()))
                           .map(|&d| level[d] + 1)
                           .max()
                           .unwrap_or(0);
    }
    let depth = order.iter().map(|&i| level[i] + 1).max().unwrap_or(0);
    let mut levels: Vec<Vec<usize>> = vec![Vec::new(); depth];
    for &i in order {
        levels[level[i]].push(i);
    }
    levels
}

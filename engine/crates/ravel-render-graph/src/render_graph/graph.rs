//! 依赖图构建和拓扑排序
//!
//! 分析 Pass 之间的资源依赖关系，构建 DAG 并进行拓扑排序。

use std::collections::{HashMap, HashSet, VecDeque};

use crate::render_graph::RgImageHandle;

/// 依赖边：从 producer 到 consumer
#[derive(Clone, Debug)]
pub struct DependencyEdge {
    /// 生产者 Pass 索引
    pub producer: usize,
    /// 消费者 Pass 索引
    pub consumer: usize,
    /// 依赖的图像资源
    pub images: Vec<RgImageHandle>,
}

/// 依赖图
///
/// 表示 Pass 之间的依赖关系，用于拓扑排序和执行顺序计算。
pub struct DependencyGraph {
    pass_count: usize,
    /// 邻接表（出边）
    adjacency: Vec<Vec<usize>>,
    in_degrees: Vec<usize>,
    edges: Vec<DependencyEdge>,
}

impl DependencyGraph {
    pub fn new(pass_count: usize) -> Self {
        Self {
            pass_count,
            adjacency: vec![Vec::new(); pass_count],
            in_degrees: vec![0; pass_count],
            edges: Vec::new(),
        }
    }

    /// 添加依赖边
    ///
    /// # 参数
    /// - `producer`: 先执行的 Pass 索引
    /// - `consumer`: 后执行的 Pass 索引
    pub fn add_edge(&mut self, producer: usize, consumer: usize, images: Vec<RgImageHandle>) {
        // 避免重复边
        if !self.adjacency[producer].contains(&consumer) {
            self.adjacency[producer].push(consumer);
            self.in_degrees[consumer] += 1;
        }

        self.edges.push(DependencyEdge {
            producer,
            consumer,
            images,
        });
    }

    /// 分析资源依赖，构建依赖图
    ///
    /// 规则（按 Pass 添加顺序）：
    /// - 写后读：reader 依赖 writer
    /// - 读后写：writer 依赖之前的 reader（保证读取完成）
    /// - 写后写：后一个 writer 依赖前一个 writer
    pub fn analyze(
        pass_count: usize,
        image_reads: &[Vec<RgImageHandle>],
        image_writes: &[Vec<RgImageHandle>],
    ) -> DependencyGraph {
        let mut graph = DependencyGraph::new(pass_count);

        // 跟踪每个资源的最后写入者
        let mut last_image_writer: HashMap<RgImageHandle, usize> = HashMap::new();
        // 跟踪每个资源在最后一次写入后的所有读取者
        let mut image_readers_since_write: HashMap<RgImageHandle, HashSet<usize>> = HashMap::new();

        for pass_idx in 0..pass_count {
            for &image in &image_reads[pass_idx] {
                if let Some(&writer) = last_image_writer.get(&image) {
                    if writer != pass_idx {
                        graph.add_edge(writer, pass_idx, vec![image]);
                    }
                }
                image_readers_since_write.entry(image).or_default().insert(pass_idx);
            }

            for &image in &image_writes[pass_idx] {
                if let Some(&prev_writer) = last_image_writer.get(&image) {
                    if prev_writer != pass_idx {
                        graph.add_edge(prev_writer, pass_idx, vec![image]);
                    }
                }
                if let Some(readers) = image_readers_since_write.get(&image) {
                    let mut readers = readers.iter().copied().filter(|&r| r != pass_idx).collect::<Vec<_>>();
                    readers.sort_unstable();
                    for reader in readers {
                        graph.add_edge(reader, pass_idx, vec![image]);
                    }
                }

                last_image_writer.insert(image, pass_idx);
                // 新的写入开始
                image_readers_since_write.insert(image, HashSet::new());
            }
        }

        graph
    }

    /// 执行拓扑排序
    ///
    /// # 返回
    /// - `Ok(order)`: 拓扑排序后的 Pass 索引列表
    /// - `Err(cycle)`: 检测到循环依赖，返回参与循环的 Pass 索引
    pub fn topological_sort(&self) -> Result<Vec<usize>, Vec<usize>> {
        let mut in_degrees = self.in_degrees.clone();
        let mut queue = (0..self.pass_count).filter(|&i| in_degrees[i] == 0).collect::<VecDeque<_>>();
        let mut result = Vec::with_capacity(self.pass_count);

        while let Some(node) = queue.pop_front() {
            result.push(node);

            for &neighbor in &self.adjacency[node] {
                in_degrees[neighbor] -= 1;
                if in_degrees[neighbor] == 0 {
                    queue.push_back(neighbor);
                }
            }
        }

        if result.len() != self.pass_count {
            Err((0..self.pass_count).filter(|&i| in_degrees[i] > 0).collect())
        } else {
            Ok(result)
        }
    }

    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn images(count: usize) -> Vec<RgImageHandle> {
        let mut map: SlotMap<RgImageHandle, ()> = SlotMap::with_key();
        (0..count).map(|_| map.insert(())).collect()
    }

    #[test]
    fn test_simple_dependency() {
        // Pass 0 写入 image 0
        // Pass 1 读取 image 0
        let img = images(1);
        let image_reads = vec![vec![], vec![img[0]]];
        let image_writes = vec![vec![img[0]], vec![]];

        let graph = DependencyGraph::analyze(2, &image_reads, &image_writes);

        let order = graph.topological_sort().unwrap();
        assert_eq!(order, vec![0, 1]);
        assert_eq!(graph.edges().len(), 1);
        assert_eq!((graph.edges()[0].producer, graph.edges()[0].consumer), (0, 1));
        assert_eq!(graph.edges()[0].images, vec![img[0]]);
    }

    #[test]
    fn test_chain_dependency() {
        // Pass 0 -> Pass 1 -> Pass 2
        let img = images(2);
        let image_reads = vec![vec![], vec![img[0]], vec![img[1]]];
        let image_writes = vec![vec![img[0]], vec![img[1]], vec![]];

        let graph = DependencyGraph::analyze(3, &image_reads, &image_writes);

        let order = graph.topological_sort().unwrap();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_parallel_passes() {
        // Pass 0 写入 image 0
        // Pass 1 写入 image 1（无依赖，可并行）
        // Pass 2 读取 image 0 和 image 1
        let img = images(2);
        let image_reads = vec![vec![], vec![], vec![img[0], img[1]]];
        let image_writes = vec![vec![img[0]], vec![img[1]], vec![]];

        let graph = DependencyGraph::analyze(3, &image_reads, &image_writes);

        let order = graph.topological_sort().unwrap();
        // Pass 0 和 1 可以任意顺序，但都在 Pass 2 之前
        assert!(order[0] == 0 || order[0] == 1);
        assert!(order[1] == 0 || order[1] == 1);
        assert_eq!(order[2], 2);
    }

    #[test]
    fn test_write_after_read() {
        // Pass 0 读取 image 0，Pass 1 随后覆盖 image 0
        let img = images(1);
        let image_reads = vec![vec![img[0]], vec![]];
        let image_writes = vec![vec![], vec![img[0]]];

        let graph = DependencyGraph::analyze(2, &image_reads, &image_writes);
        let edge = &graph.edges()[0];
        assert_eq!((edge.producer, edge.consumer), (0, 1));
        assert_eq!(graph.topological_sort().unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_read_write_same_pass_has_no_self_edge() {
        let img = images(1);
        let image_reads = vec![vec![img[0]]];
        let image_writes = vec![vec![img[0]]];

        let graph = DependencyGraph::analyze(1, &image_reads, &image_writes);
        assert!(graph.edges().is_empty());
    }

    #[test]
    fn test_cycle_detected() {
        let mut graph = DependencyGraph::new(2);
        graph.add_edge(0, 1, vec![]);
        graph.add_edge(1, 0, vec![]);
        assert_eq!(graph.topological_sort().unwrap_err(), vec![0, 1]);
    }
}
